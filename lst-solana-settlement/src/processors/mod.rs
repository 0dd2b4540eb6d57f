//! # Settlement Processors
//!
//! Each processor re-derives the actual value transfer from the structured
//! transaction detail and, when it qualifies, submits exactly one
//! counter-transaction through the shared [`Submitter`].
//!
//! - [`DepositProcessor`]: lamports into the treasury → mint derivative tokens.
//! - [`WithdrawalProcessor`]: derivative tokens into the treasury token account
//!   → return lamports.

mod deposit;
mod withdrawal;

pub use deposit::{DepositProcessor, DepositRecord};
pub use withdrawal::{RedemptionRecord, WithdrawalProcessor};

use crate::{
    client::{LedgerHandle, Submitter},
    config::Treasury,
    rate::ExchangeRate,
};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use spl_associated_token_account_client::address::get_associated_token_address;
use std::sync::Arc;

/// The custodial account and the token account it receives redemptions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedAccount {
    pub address: Pubkey,
    pub token_mint: Pubkey,
    /// Associated token account of `address` for `token_mint`.
    pub token_account: Pubkey,
}

impl WatchedAccount {
    pub fn new(address: Pubkey, token_mint: Pubkey) -> Self {
        Self {
            address,
            token_mint,
            token_account: get_associated_token_address(&address, &token_mint),
        }
    }

    pub fn from_config(treasury: &Treasury) -> Self {
        Self::new(treasury.address, treasury.token_mint)
    }
}

/// A shared context containing all dependencies required by the processors.
pub struct SettlementContext {
    pub watched: WatchedAccount,
    pub rate: ExchangeRate,
    pub ledger: LedgerHandle,
    pub submitter: Submitter,
}

/// Why a dispatched event produced no counter-transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither marker family matched.
    Unclassified,
    /// The origin transaction failed on-chain.
    FailedTransaction,
    /// The treasury balance did not increase.
    NonPositiveDelta,
    /// No parsed SPL token transfer in the transaction.
    NoTokenTransfer,
    /// The token transfer went somewhere other than the treasury token account.
    ForeignDestination,
    /// The transfer was for a different mint.
    ForeignMint,
    /// The converted amount rounds down to zero.
    ZeroAmount,
    /// The settlement store already holds a claim for this origin.
    AlreadySettled,
}

/// A processor's verdict on one transaction detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation<R> {
    Settle(R),
    /// Dropped without side effects.
    Skip(SkipReason),
}

/// The result of dispatching one observed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Minted {
        record: DepositRecord,
        signature: Signature,
    },
    Refunded {
        record: RedemptionRecord,
        signature: Signature,
    },
    Skipped(SkipReason),
}

pub(crate) type SharedContext = Arc<SettlementContext>;
