//! Wallet commands: create, list, show, rename, remove.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use coffre_crypto::mnemonic::Mnemonic;
use coffre_types::{CoffreError, Result};
use coffre_vault::VaultStore;
use coffre_wallet::{validate_alias, Wallet};

use crate::output;
use crate::prompt::{self, TerminalPrompt};
use crate::GlobalOpts;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ChainFilter {
    Eth,
    Btc,
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Create a wallet from a fresh, imported, or entropy-built mnemonic.
    Create {
        /// Wallet alias.
        alias: String,
        /// Import these mnemonic words instead of generating.
        #[arg(long, value_name = "WORDS", conflicts_with = "entropy")]
        mnemonic: Option<String>,
        /// Word count for a generated mnemonic (12/15/18/21/24).
        #[arg(long, default_value_t = 24)]
        mnemonic_length: usize,
        /// Build the mnemonic from explicit entropy bytes (hex).
        #[arg(long, value_name = "HEX")]
        entropy: Option<String>,
        /// Protect the mnemonic with an additional passphrase (prompted).
        #[arg(long)]
        passphrase: bool,
        /// Derive and print without saving to the vault.
        #[arg(long)]
        ephemeral: bool,
    },
    /// List vault wallets.
    List,
    /// Show a wallet's accounts and addresses.
    Show {
        /// Wallet alias.
        alias: String,
        /// Restrict output to one chain.
        #[arg(long, value_enum)]
        chain: Option<ChainFilter>,
        /// Include private key material in the output.
        #[arg(long)]
        reveal_private_key: bool,
    },
    /// Rename a wallet.
    Rename {
        /// Current alias.
        from: String,
        /// New alias.
        to: String,
    },
    /// Remove a wallet permanently.
    Remove {
        /// Wallet alias.
        alias: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: WalletAction, opts: &GlobalOpts, vault_dir: &Option<PathBuf>) -> Result<()> {
    match action {
        WalletAction::Create {
            alias,
            mnemonic,
            mnemonic_length,
            entropy,
            passphrase,
            ephemeral,
        } => create(
            opts,
            vault_dir,
            &alias,
            mnemonic.as_deref(),
            mnemonic_length,
            entropy.as_deref(),
            passphrase,
            ephemeral,
        ),
        WalletAction::List => list(opts, vault_dir),
        WalletAction::Show {
            alias,
            chain,
            reveal_private_key,
        } => show(opts, vault_dir, &alias, chain, reveal_private_key),
        WalletAction::Rename { from, to } => rename(opts, vault_dir, &from, &to),
        WalletAction::Remove { alias, yes } => remove(opts, vault_dir, &alias, yes),
    }
}

/// Opens the vault and runs the secret gate.
fn unlocked(opts: &GlobalOpts, vault_dir: &Option<PathBuf>) -> Result<VaultStore> {
    let mut store = opts.open_vault(vault_dir)?;
    coffre_vault::unlock(&mut store, &TerminalPrompt)?;
    Ok(store)
}

/// Rehydrates a stored wallet, prompting for the mnemonic passphrase
/// when the stored record requires one.
pub(crate) fn load_wallet(
    store: &mut VaultStore,
    alias: &str,
    opts: &GlobalOpts,
) -> Result<Wallet> {
    let stored = store
        .get_wallet(alias)?
        .ok_or_else(|| CoffreError::parameter(format!("unknown wallet {alias:?}")))?;
    let passphrase = if stored.mnemonic.has_passphrase {
        Some(prompt::mnemonic_passphrase(false)?)
    } else {
        None
    };
    Wallet::from_stored(&stored, passphrase.as_deref(), opts.network)
}

#[allow(clippy::too_many_arguments)]
fn create(
    opts: &GlobalOpts,
    vault_dir: &Option<PathBuf>,
    alias: &str,
    words: Option<&str>,
    mnemonic_length: usize,
    entropy: Option<&str>,
    with_passphrase: bool,
    ephemeral: bool,
) -> Result<()> {
    // Validate everything before prompting or touching the vault.
    validate_alias(alias)?;

    let passphrase = if with_passphrase {
        Some(prompt::mnemonic_passphrase(true)?)
    } else {
        None
    };

    let generated = words.is_none();
    let mnemonic = match (words, entropy) {
        (Some(words), None) => Mnemonic::import(words, passphrase)?,
        (None, Some(entropy_hex)) => {
            let bytes = hex::decode(entropy_hex)
                .map_err(|e| CoffreError::parameter(format!("invalid entropy hex: {e}")))?;
            Mnemonic::from_entropy(&bytes, passphrase)?
        }
        (None, None) => Mnemonic::generate(mnemonic_length, passphrase)?,
        // clap's conflicts_with already rules this out.
        (Some(_), Some(_)) => {
            return Err(CoffreError::parameter(
                "pass either --mnemonic or --entropy, not both",
            ))
        }
    };

    let wallet = Wallet::generate_with_default_account(alias, mnemonic, opts.network)?;

    if !ephemeral {
        let mut store = unlocked(opts, vault_dir)?;
        store.save(wallet.serialize())?;
    }

    let mut accounts = serde_json::Map::new();
    for account in wallet.accounts() {
        accounts.insert(
            account.alias.clone(),
            serde_json::json!({
                "index": account.index,
                "eth": account.eth.keys.address,
                "btc": account.btc.keys.address,
            }),
        );
    }
    let mut body = serde_json::Map::new();
    body.insert("alias".into(), alias.into());
    body.insert("ephemeral".into(), ephemeral.into());
    body.insert("accounts".into(), accounts.into());
    if generated {
        // A generated mnemonic is shown exactly once, at creation.
        body.insert("mnemonic".into(), wallet.mnemonic().words().into());
    }
    output::print_json_value(&serde_json::Value::Object(body), opts.json);

    if generated && !opts.json {
        output::print_notice(
            "write the mnemonic down; it is the only way to recover this wallet",
            opts.json,
        );
    }
    if !ephemeral {
        output::print_success(&format!("wallet '{alias}' saved"), opts.json);
    }
    Ok(())
}

fn list(opts: &GlobalOpts, vault_dir: &Option<PathBuf>) -> Result<()> {
    let mut store = unlocked(opts, vault_dir)?;
    let rows: Vec<Vec<String>> = store
        .all_wallets()?
        .iter()
        .map(|w| {
            vec![
                w.alias.clone(),
                w.accounts.len().to_string(),
                if w.mnemonic.has_passphrase { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    output::print_table(&["alias", "accounts", "passphrase"], &rows, opts.json);
    Ok(())
}

fn show(
    opts: &GlobalOpts,
    vault_dir: &Option<PathBuf>,
    alias: &str,
    chain: Option<ChainFilter>,
    reveal_private_key: bool,
) -> Result<()> {
    let mut store = unlocked(opts, vault_dir)?;
    let wallet = load_wallet(&mut store, alias, opts)?;

    let mut headers = vec!["account", "index", "chain", "address"];
    if reveal_private_key {
        headers.push("private key");
    }

    let mut rows = Vec::new();
    for account in wallet.accounts() {
        if chain != Some(ChainFilter::Btc) {
            let mut row = vec![
                account.alias.clone(),
                account.index.to_string(),
                "ETH".to_string(),
                account.eth.keys.address.clone(),
            ];
            if reveal_private_key {
                row.push(account.eth.keys.private_key.clone());
            }
            rows.push(row);
        }
        if chain != Some(ChainFilter::Eth) {
            let mut row = vec![
                account.alias.clone(),
                account.index.to_string(),
                "BTC".to_string(),
                account.btc.keys.address.clone(),
            ];
            if reveal_private_key {
                row.push(account.btc.keys.private_key_wif.clone());
            }
            rows.push(row);
        }
    }
    output::print_table(&headers, &rows, opts.json);
    Ok(())
}

fn rename(opts: &GlobalOpts, vault_dir: &Option<PathBuf>, from: &str, to: &str) -> Result<()> {
    let mut store = unlocked(opts, vault_dir)?;
    store.rename(from, to)?;
    output::print_success(&format!("wallet '{from}' renamed to '{to}'"), opts.json);
    Ok(())
}

fn remove(opts: &GlobalOpts, vault_dir: &Option<PathBuf>, alias: &str, yes: bool) -> Result<()> {
    let mut store = unlocked(opts, vault_dir)?;
    // Fail on unknown aliases before asking for confirmation.
    if store.get_wallet(alias)?.is_none() {
        return Err(CoffreError::parameter(format!("unknown wallet {alias:?}")));
    }

    if !yes && !prompt::confirm(&format!("permanently remove wallet '{alias}'?"))? {
        output::print_kv("status", "cancelled", opts.json);
        return Ok(());
    }

    store.remove(alias)?;
    output::print_success(&format!("wallet '{alias}' removed"), opts.json);
    Ok(())
}
