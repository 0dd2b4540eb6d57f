use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;

/// What a settled origin transaction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SettlementReceipt {
    pub origin_signature: String,
    pub kind: ReceiptKind,
    /// `None` while the claim is held but the counter-transaction is not yet confirmed.
    pub counter_signature: Option<String>,
    /// Token base units minted or lamports refunded.
    pub amount: u64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReceiptKind {
    Mint,
    Refund,
}

impl SettlementReceipt {
    pub fn claimed(origin: &Signature, kind: ReceiptKind, amount: u64) -> Self {
        Self {
            origin_signature: origin.to_string(),
            kind,
            counter_signature: None,
            amount,
            recorded_at: Utc::now(),
        }
    }

    pub fn completed(mut self, counter: &Signature) -> Self {
        self.counter_signature = Some(counter.to_string());
        self.recorded_at = Utc::now();
        self
    }
}

/// A trait defining a durable record of settled origin transactions.
///
/// When configured, every counter-transaction is preceded by a [`claim`] that
/// succeeds at most once per origin signature, which makes settlement
/// at-most-once across redeliveries and restarts.
///
/// [`claim`]: SettlementStore::claim
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Atomically records `receipt` for its origin signature unless one exists.
    /// Returns `false` if the origin was already claimed.
    async fn claim(&self, receipt: &SettlementReceipt) -> Result<bool>;

    /// Overwrites the receipt once the counter-transaction is confirmed.
    async fn complete(&self, receipt: &SettlementReceipt) -> Result<()>;

    /// Looks up the receipt for an origin signature.
    async fn receipt(&self, origin: &Signature) -> Result<Option<SettlementReceipt>>;
}
