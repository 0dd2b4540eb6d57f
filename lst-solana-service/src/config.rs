use anyhow::{Context, Result};
use lst_solana_logger::LogConfig;
use lst_solana_settlement::config::SettlementConfig;
use serde::Deserialize;

/// The top-level configuration for the settlement service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub service: ServiceSpecificConfig,
}

/// Contains settings that are unique to the service binary.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServiceSpecificConfig {
    /// Path of the sled database recording settled origin transactions.
    /// When unset, no settlement state is kept and a redelivered
    /// notification is settled again.
    pub db_path: Option<String>,
    /// Logging configuration.
    pub log: LogConfig,
}

/// Loads the service configuration from a TOML file, with `LST__`-prefixed
/// environment variables taking precedence.
///
/// For example `LST__SETTLEMENT__SOLANA__COMMITMENT=finalized` overrides
/// `settlement.solana.commitment`. Only single-word keys can be overridden
/// this way: the environment source turns `RPC_URL` into `rpc_url`, which
/// never matches a kebab-case key such as `rpc-url`. Set those in the file.
pub fn load_config(path: &str) -> Result<ServiceConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(
            config::Environment::with_prefix("LST")
                .prefix_separator("__")
                .separator("__"),
        );

    let settings: ServiceConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", path))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}
