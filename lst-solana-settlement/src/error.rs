use solana_client::client_error::ClientError;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Every way a settlement can fail.
///
/// Only [`SettlementError::CredentialLoadFailure`] and
/// [`SettlementError::SubscriptionFailure`] are fatal; everything else is
/// scoped to the event being dispatched and is dropped after being logged.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("Account {0} not found in transaction account keys")]
    AccountNotFound(Pubkey),

    #[error("Treasury token account {0} does not exist")]
    TreasuryAccountMissing(Pubkey),

    #[error("Transaction {0} not found")]
    TransactionNotFound(Signature),

    #[error("Malformed transaction detail: {0}")]
    MalformedTransaction(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Ledger call '{0}' timed out")]
    Timeout(&'static str),

    #[error("Failed to build instruction: {0}")]
    InstructionBuild(String),

    #[error("Settlement store failure: {0}")]
    Store(String),

    #[error("Failed to load treasury credential: {0}")]
    CredentialLoadFailure(String),

    #[error("Log subscription failed: {0}")]
    SubscriptionFailure(String),
}

impl SettlementError {
    /// Whether the process must stop instead of dropping the current event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SettlementError::CredentialLoadFailure(_) | SettlementError::SubscriptionFailure(_)
        )
    }
}

impl From<ClientError> for SettlementError {
    fn from(err: ClientError) -> Self {
        SettlementError::NetworkFailure(err.to_string())
    }
}

pub type Result<T, E = SettlementError> = std::result::Result<T, E>;
