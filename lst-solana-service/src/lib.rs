pub mod cli;
pub mod config;
pub mod storage;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{load_config, ServiceConfig};
use lst_solana_settlement::{
    credentials::load_treasury_keypair, listener::SettlementListener, storage::SettlementStore,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{write_keypair_file, Keypair},
    signer::Signer,
};
use std::{path::Path, sync::Arc};
use storage::SledSettlementStore;
use tokio::signal;

/// The main entry point for the service binary.
/// This function handles CLI parsing and dispatches to the chosen subcommand.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_cmd) => {
            let config = load_config_from_cli(run_cmd)?;
            lst_solana_logger::init(&config.service.log)?;
            tracing::info!("Configuration loaded: {:#?}", &config);
            run_listener(config).await
        }
        Commands::Keygen(keygen_cmd) => {
            let pubkey = generate_keypair(&keygen_cmd.outfile, keygen_cmd.force)?;
            println!("{}", pubkey);
            Ok(())
        }
    }
}

/// Loads the service configuration based on the provided CLI command.
fn load_config_from_cli(run_cmd: cli::RunCmd) -> Result<ServiceConfig> {
    if let Some(config_path) = run_cmd.config {
        println!("Loading configuration from '{}'", &config_path);
        load_config(&config_path)
    } else {
        println!("No config file provided, using default settings.");
        Ok(ServiceConfig::default())
    }
}

/// Writes a fresh keypair to `outfile` and returns its public key.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn generate_keypair(outfile: &str, force: bool) -> Result<String> {
    if Path::new(outfile).exists() && !force {
        bail!("'{}' already exists, pass --force to overwrite it", outfile);
    }

    let keypair = Keypair::new();
    write_keypair_file(&keypair, outfile)
        .map_err(|e| anyhow::anyhow!("Failed to write keypair to '{}': {}", outfile, e))?;
    Ok(keypair.pubkey().to_string())
}

/// Opens the settlement store, if one is configured.
pub fn open_store(config: &ServiceConfig) -> Result<Option<Arc<dyn SettlementStore>>> {
    match &config.service.db_path {
        Some(path) => {
            tracing::info!(db_path = %path, "Recording settlements in sled");
            Ok(Some(Arc::new(SledSettlementStore::open(path)?)))
        }
        None => {
            tracing::warn!(
                "No db-path configured: redelivered notifications will be settled again"
            );
            Ok(None)
        }
    }
}

/// Runs the settlement listener until it fails or Ctrl+C is received.
async fn run_listener(config: ServiceConfig) -> Result<()> {
    let store = open_store(&config)?;
    let settlement = Arc::new(config.settlement);

    let treasury = &settlement.treasury;
    let signer = load_treasury_keypair(&treasury.keypair_path, &treasury.address)
        .context("Cannot start without the treasury credential")?;

    let rpc_client = RpcClient::new_with_commitment(
        settlement.solana.rpc_url.clone(),
        CommitmentConfig {
            commitment: settlement.solana.commitment,
        },
    );
    let listener = SettlementListener::new(
        settlement.clone(),
        Arc::new(rpc_client),
        Arc::new(signer),
        store,
    )?;

    tokio::select! {
        result = listener.run() => {
            result.context("Settlement listener stopped")?;
        }
        signal = signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down."),
            Err(err) => tracing::error!(error = %err, "Failed to listen for shutdown signal."),
        },
    }
    Ok(())
}
