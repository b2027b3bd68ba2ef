//! Transaction commands: sign and broadcast.

use std::path::PathBuf;

use clap::Subcommand;
use coffre_tx::{assembler, Provider, Utxo};
use coffre_types::{CoffreError, Result};
use coffre_wallet::address::ChainAddress;

use crate::commands::wallet::load_wallet;
use crate::output;
use crate::prompt::TerminalPrompt;
use crate::GlobalOpts;

#[derive(Subcommand)]
pub enum TxAction {
    /// Assemble and sign a Bitcoin transaction from explicit UTXOs.
    Sign {
        /// Wallet alias.
        #[arg(long)]
        wallet: String,
        /// Account alias within the wallet.
        #[arg(long, default_value = "default")]
        account: String,
        /// Spendable output as hash:index:value (repeatable).
        #[arg(long = "utxo", value_name = "HASH:INDEX:VALUE", required = true)]
        utxos: Vec<String>,
        /// Recipient address.
        #[arg(long)]
        to: String,
        /// Amount to send, in satoshis.
        #[arg(long)]
        amount: u64,
        /// Fee, in satoshis.
        #[arg(long)]
        fee: u64,
    },
    /// Broadcast a signed raw transaction.
    Broadcast {
        /// Signed raw transaction hex.
        #[arg(long, value_name = "HEX")]
        raw: String,
        /// Target: mempool, blockstream, or a URL.
        #[arg(long, default_value = "mempool")]
        provider: String,
    },
}

pub fn run(action: TxAction, opts: &GlobalOpts, vault_dir: &Option<PathBuf>) -> Result<()> {
    match action {
        TxAction::Sign {
            wallet,
            account,
            utxos,
            to,
            amount,
            fee,
        } => sign(opts, vault_dir, &wallet, &account, &utxos, &to, amount, fee),
        TxAction::Broadcast { raw, provider } => broadcast(opts, &raw, &provider),
    }
}

#[allow(clippy::too_many_arguments)]
fn sign(
    opts: &GlobalOpts,
    vault_dir: &Option<PathBuf>,
    wallet_alias: &str,
    account_alias: &str,
    utxo_specs: &[String],
    to: &str,
    amount: u64,
    fee: u64,
) -> Result<()> {
    // Parse everything before unlocking the vault.
    let utxos = utxo_specs
        .iter()
        .map(|s| s.parse::<Utxo>())
        .collect::<Result<Vec<_>>>()?;

    let mut store = opts.open_vault(vault_dir)?;
    coffre_vault::unlock(&mut store, &TerminalPrompt)?;
    let wallet = load_wallet(&mut store, wallet_alias, opts)?;
    let account = wallet.account(account_alias).ok_or_else(|| {
        CoffreError::parameter(format!(
            "unknown account {account_alias:?} in wallet {wallet_alias:?}"
        ))
    })?;

    let unsigned =
        assembler::create_transaction(&account.btc, to, amount, fee, &utxos, opts.network)?;
    let raw = assembler::sign(
        unsigned,
        &ChainAddress::Btc(account.btc.clone()),
        &utxos,
        opts.network,
    )?;
    let vsize = assembler::calc_vsize(&raw)?;

    output::print_json_value(
        &serde_json::json!({
            "raw": raw,
            "vsize": vsize,
            "feeRate": format!("{:.1} sat/vB", fee as f64 / vsize as f64),
        }),
        opts.json,
    );
    Ok(())
}

fn broadcast(opts: &GlobalOpts, raw: &str, provider: &str) -> Result<()> {
    let provider: Provider = provider.parse()?;
    let response = provider.broadcast(raw, opts.network)?;
    output::print_kv("response", response.trim(), opts.json);
    Ok(())
}
