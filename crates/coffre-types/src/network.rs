//! Bitcoin network selection.
//!
//! The network is process-wide and chosen once per invocation, either
//! from the `COFFRE_NETWORK` environment variable or defaulting to
//! mainnet. It only affects BTC address encoding and WIF prefixes —
//! ETH derivation is network-independent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoffreError;

/// Environment variable selecting the Bitcoin network.
pub const NETWORK_ENV: &str = "COFFRE_NETWORK";

/// Bitcoin network flavor for address encoding.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet (`bc1…` addresses). The default.
    #[default]
    Mainnet,
    /// Bitcoin testnet (`tb1…` addresses).
    Testnet,
    /// Local regtest (`bcrt1…` addresses).
    Regtest,
}

impl Network {
    /// Resolves the network from the environment.
    ///
    /// A missing or blank `COFFRE_NETWORK` yields `(Mainnet, true)`; the
    /// boolean tells the caller whether the default was applied so it can
    /// print a one-time notice.
    pub fn from_env() -> Result<(Self, bool), CoffreError> {
        match std::env::var(NETWORK_ENV) {
            Ok(raw) if !raw.trim().is_empty() => {
                let network = raw.trim().parse()?;
                Ok((network, false))
            }
            _ => Ok((Self::Mainnet, true)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Regtest => write!(f, "regtest"),
        }
    }
}

impl FromStr for Network {
    type Err = CoffreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            other => Err(CoffreError::parameter(format!(
                "unknown network '{other}' (expected mainnet, testnet, or regtest)"
            ))),
        }
    }
}
