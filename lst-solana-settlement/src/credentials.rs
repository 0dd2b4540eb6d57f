use crate::error::{Result, SettlementError};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
};
use std::path::Path;

/// Loads the treasury keypair from a JSON byte-array file and checks that it
/// controls `expected`.
///
/// Every failure is a [`SettlementError::CredentialLoadFailure`]; the error
/// message never includes key material.
pub fn load_treasury_keypair(path: impl AsRef<Path>, expected: &Pubkey) -> Result<Keypair> {
    let path = path.as_ref();
    let keypair = read_keypair_file(path).map_err(|e| {
        SettlementError::CredentialLoadFailure(format!("{}: {}", path.display(), e))
    })?;

    if keypair.pubkey() != *expected {
        return Err(SettlementError::CredentialLoadFailure(format!(
            "{} holds the key for {}, but the treasury is {}",
            path.display(),
            keypair.pubkey(),
            expected
        )));
    }

    tracing::info!(treasury = %expected, "Treasury keypair loaded");
    Ok(keypair)
}
