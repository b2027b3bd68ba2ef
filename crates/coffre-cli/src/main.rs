//! Coffre CLI — local offline vault for cryptocurrency key material.

mod commands;
mod output;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coffre_types::network::Network;
use coffre_types::{CoffreError, Result};
use coffre_vault::VaultStore;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Vault directory under the user's home when `--vault-dir` is absent.
const DEFAULT_VAULT_DIR: &str = ".coffre";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Coffre — offline wallet vault and Bitcoin transaction signer.
#[derive(Parser)]
#[command(name = "coffre", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Vault directory (defaults to ~/.coffre).
    #[arg(long, global = true, value_name = "DIR")]
    vault_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect, and manage wallets.
    Wallet {
        #[command(subcommand)]
        action: commands::wallet::WalletAction,
    },
    /// Assemble, sign, and broadcast Bitcoin transactions.
    Tx {
        #[command(subcommand)]
        action: commands::tx::TxAction,
    },
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub network: Network,
}

impl GlobalOpts {
    /// Opens the vault store at the selected directory.
    pub fn open_vault(&self, dir: &Option<PathBuf>) -> Result<VaultStore> {
        let dir = match dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    CoffreError::persistence("cannot locate home directory; pass --vault-dir")
                })?
                .join(DEFAULT_VAULT_DIR),
        };
        VaultStore::open(dir)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    // Tracing / logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = run(cli);
    if let Err(e) = result {
        output::print_error(&e.to_string(), json);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (network, defaulted) = Network::from_env()?;
    if defaulted && !cli.json {
        output::print_notice(
            &format!(
                "network not set ({}); using mainnet",
                coffre_types::network::NETWORK_ENV
            ),
            cli.json,
        );
    }

    let opts = GlobalOpts {
        json: cli.json,
        network,
    };

    match cli.command {
        Commands::Wallet { action } => commands::wallet::run(action, &opts, &cli.vault_dir),
        Commands::Tx { action } => commands::tx::run(action, &opts, &cli.vault_dir),
    }
}
