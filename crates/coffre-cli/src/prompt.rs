//! Terminal secret entry and confirmations.

use std::io::Write;

use coffre_types::{CoffreError, Result};
use coffre_vault::SecretPrompt;

/// Hidden-input prompt over the controlling terminal.
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn read_secret(&self, prompt: &str) -> Result<Option<String>> {
        let entered = rpassword::prompt_password(format!("{prompt}: ")).map_err(|e| {
            CoffreError::parameter(format!("cannot read passphrase from terminal: {e}"))
        })?;
        // An empty entry is treated as cancellation.
        if entered.is_empty() {
            return Ok(None);
        }
        Ok(Some(entered))
    }
}

/// Asks a yes/no question; anything but `y`/`yes` declines.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    std::io::stdout()
        .flush()
        .map_err(|e| CoffreError::parameter(format!("cannot write to terminal: {e}")))?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| CoffreError::parameter(format!("cannot read from terminal: {e}")))?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Prompts for a mnemonic passphrase, with a confirmation repeat when
/// `confirm_repeat` is set (wallet creation).
pub fn mnemonic_passphrase(confirm_repeat: bool) -> Result<String> {
    let prompt = TerminalPrompt;
    let first = prompt
        .read_secret("Mnemonic passphrase")?
        .ok_or_else(|| CoffreError::parameter("passphrase entry cancelled"))?;
    if confirm_repeat {
        let second = prompt
            .read_secret("Repeat mnemonic passphrase")?
            .ok_or_else(|| CoffreError::parameter("passphrase entry cancelled"))?;
        if first != second {
            return Err(CoffreError::parameter("passphrases do not match"));
        }
    }
    Ok(first)
}
