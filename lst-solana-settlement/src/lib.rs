//! Settlement core for exchanging SOL against a custodial derivative token.
//!
//! The crate watches a single treasury account, classifies every transaction
//! that mentions it, and answers each qualifying one with a counter-transaction:
//! lamports in are answered with a token mint, tokens in are answered with a
//! lamport refund, both at a fixed exchange rate.
//!
//! # Key Components
//!
//! *   [`listener::SettlementListener`]: owns the log subscription and the dispatch loop.
//! *   [`classifier::TransactionClassifier`]: labels observed events from their log lines.
//! *   [`processors`]: the deposit and withdrawal processors that build and submit
//!     counter-transactions.
//! *   [`client::LedgerClient`]: the RPC seam, implemented for the nonblocking `RpcClient`.
//! *   [`rate::ExchangeRate`]: floor-rounded fixed-point conversion between the currencies.
pub mod classifier;
pub mod client;
/// Defines configuration structures for the settlement service.
pub mod config;
/// Loading of the treasury keypair.
pub mod credentials;
/// Decoding of confirmed transactions into balances and token transfers.
pub mod detail;
pub mod error;
/// Observed log notifications.
pub mod events;
pub mod listener;
pub mod processors;
pub mod rate;
/// A trait for durable, at-most-once settlement records.
pub mod storage;

pub use error::{Result, SettlementError};
