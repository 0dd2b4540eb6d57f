use clap::{Parser, Subcommand};

/// The main CLI structure for the LST settlement service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Defines the available subcommands for the application.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the settlement listener.
    /// This subscribes to the treasury's logs and settles deposits and redemptions.
    Run(RunCmd),
    /// Generate a new keypair file for use as the treasury credential.
    Keygen(KeygenCmd),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to the service configuration TOML file.
    /// If not provided, default values will be used.
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenCmd {
    /// Where to write the keypair, as a JSON array of 64 bytes.
    #[arg(short, long)]
    pub outfile: String,
    /// Overwrite `outfile` if it already exists.
    #[arg(long)]
    pub force: bool,
}
