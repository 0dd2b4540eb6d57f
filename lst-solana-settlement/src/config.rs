#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use solana_sdk::{commitment_config::CommitmentLevel, pubkey, pubkey::Pubkey};

/// The top-level configuration for the `lst-solana-settlement` library.
///
/// Every value is fixed for the lifetime of the process. It is typically
/// deserialized from a configuration file by the service binary and passed to
/// [`crate::listener::SettlementListener`] on startup.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct SettlementConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub solana: Solana,
    #[cfg_attr(feature = "serde", serde(default))]
    pub treasury: Treasury,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exchange: Exchange,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dispatch: Dispatch,
}

/// Defines the connection settings for the Solana cluster.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct Solana {
    pub rpc_url: String,
    pub ws_url: String,
    #[cfg_attr(feature = "serde", serde(with = "serde_commitment"))]
    pub commitment: CommitmentLevel,
}

/// The custodial account being watched and the credential that controls it.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct Treasury {
    #[cfg_attr(feature = "serde", serde(with = "serde_pubkey"))]
    pub address: Pubkey,
    /// Mint of the derivative token. The treasury keypair is its mint authority.
    #[cfg_attr(feature = "serde", serde(with = "serde_pubkey"))]
    pub token_mint: Pubkey,
    /// Path to a JSON byte-array keypair file for `address`.
    pub keypair_path: String,
}

/// The fixed exchange rate, expressed in whole units: `1 native = numerator / denominator tokens`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct Exchange {
    pub rate_numerator: u64,
    pub rate_denominator: u64,
    pub native_decimals: u8,
    pub token_decimals: u8,
}

/// Defines how observed events are scheduled.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case", default))]
pub struct Dispatch {
    /// Number of events dispatched at once. `1` processes notifications strictly in order.
    pub max_concurrency: usize,
    /// Deadline applied to every individual ledger round-trip.
    pub request_timeout_secs: u64,
}

impl Default for Solana {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            ws_url: "wss://api.devnet.solana.com".to_string(),
            commitment: CommitmentLevel::Confirmed,
        }
    }
}

impl Default for Treasury {
    fn default() -> Self {
        Self {
            address: pubkey!("BnyU8BGb6Ut6zvM1iRyzpJk2DtS8qAJsdyMvvZUAs1CZ"),
            token_mint: pubkey!("NUD3nTfiXAX7NzfPSZdQoZxDr9ckGpgN7vawdedDXNq"),
            keypair_path: "./treasury-keypair.json".to_string(),
        }
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self {
            rate_numerator: 100,
            rate_denominator: 1,
            native_decimals: 9,
            token_decimals: 9,
        }
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            request_timeout_secs: 30,
        }
    }
}

#[cfg(feature = "serde")]
mod serde_commitment {

    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(c: &CommitmentLevel, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match c {
            CommitmentLevel::Processed => "Processed",
            CommitmentLevel::Confirmed => "Confirmed",
            CommitmentLevel::Finalized => "Finalized",
        };
        serializer.serialize_str(s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<CommitmentLevel, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let level = match s.to_lowercase().as_str() {
            "processed" => CommitmentLevel::Processed,
            "confirmed" => CommitmentLevel::Confirmed,
            "finalized" => CommitmentLevel::Finalized,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown commitment level '{other}'"
                )))
            }
        };
        Ok(level)
    }
}

#[cfg(feature = "serde")]
mod serde_pubkey {

    use super::*;
    use serde::{Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}
