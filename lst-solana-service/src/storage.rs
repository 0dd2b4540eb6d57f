//! Provides a concrete `sled`-based implementation of the `SettlementStore`
//! trait defined in the `lst-solana-settlement` library.
use anyhow::{Context, Result};
use async_trait::async_trait;
use sled::Db;
use solana_sdk::signature::Signature;

use lst_solana_settlement::storage::{SettlementReceipt, SettlementStore};

const RECEIPT_PREFIX: &str = "settlement::receipt::";

/// A `sled`-backed implementation of the `SettlementStore` trait.
///
/// Receipts are keyed by origin signature and encoded with `bincode`. A claim
/// is a compare-and-swap against an absent key, so at most one claim per
/// origin ever succeeds.
#[derive(Clone)]
pub struct SledSettlementStore {
    db: Db,
}

impl SledSettlementStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Opens (or creates) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path).with_context(|| format!("Failed to open sled db at '{}'", path))?;
        Ok(Self::new(db))
    }

    fn key(origin: &str) -> String {
        format!("{RECEIPT_PREFIX}{origin}")
    }

    fn encode(receipt: &SettlementReceipt) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(receipt, bincode::config::standard())
            .context("Failed to encode settlement receipt")
    }

    fn decode(bytes: &[u8]) -> Result<SettlementReceipt> {
        let (receipt, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .context("Failed to decode settlement receipt")?;
        Ok(receipt)
    }
}

#[async_trait]
impl SettlementStore for SledSettlementStore {
    async fn claim(&self, receipt: &SettlementReceipt) -> Result<bool> {
        let key = Self::key(&receipt.origin_signature);
        let value = Self::encode(receipt)?;

        let swapped = self
            .db
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value))?;
        if swapped.is_err() {
            return Ok(false);
        }

        self.db.flush_async().await?;
        Ok(true)
    }

    async fn complete(&self, receipt: &SettlementReceipt) -> Result<()> {
        let key = Self::key(&receipt.origin_signature);
        self.db.insert(key.as_bytes(), Self::encode(receipt)?)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn receipt(&self, origin: &Signature) -> Result<Option<SettlementReceipt>> {
        self.db
            .get(Self::key(&origin.to_string()).as_bytes())?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }
}
