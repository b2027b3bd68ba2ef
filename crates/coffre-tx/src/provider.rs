//! Broadcast targets for signed transactions.
//!
//! Targets are a closed set: two named public APIs plus a generic URL
//! fallback, resolved through one exhaustive mapping. Broadcast is a
//! single POST of the raw hex; transport failures surface verbatim and
//! are never retried.

use std::str::FromStr;

use coffre_types::network::Network;
use coffre_types::{CoffreError, Result};
use tracing::info;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Where to POST a signed raw transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Provider {
    /// mempool.space public API.
    Mempool,
    /// blockstream.info public API.
    Blockstream,
    /// Any endpoint accepting raw hex via POST.
    Url(String),
}

impl FromStr for Provider {
    type Err = CoffreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mempool" => Ok(Provider::Mempool),
            "blockstream" => Ok(Provider::Blockstream),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Provider::Url(url.to_owned()))
            }
            other => Err(CoffreError::parameter(format!(
                "unknown provider {other:?}: expected mempool, blockstream, or a URL"
            ))),
        }
    }
}

impl Provider {
    /// Resolves the POST endpoint for `network`.
    ///
    /// # Errors
    ///
    /// [`CoffreError::Parameter`] when a named provider has no public
    /// endpoint for the network (regtest needs an explicit URL).
    pub fn endpoint(&self, network: Network) -> Result<String> {
        match (self, network) {
            (Provider::Url(url), _) => Ok(url.clone()),
            (Provider::Mempool, Network::Mainnet) => Ok("https://mempool.space/api/tx".into()),
            (Provider::Mempool, Network::Testnet) => {
                Ok("https://mempool.space/testnet/api/tx".into())
            }
            (Provider::Blockstream, Network::Mainnet) => {
                Ok("https://blockstream.info/api/tx".into())
            }
            (Provider::Blockstream, Network::Testnet) => {
                Ok("https://blockstream.info/testnet/api/tx".into())
            }
            (Provider::Mempool | Provider::Blockstream, Network::Regtest) => {
                Err(CoffreError::parameter(
                    "no public endpoint for regtest; pass a URL instead",
                ))
            }
        }
    }

    /// POSTs `raw_hex` and returns the response body (typically the
    /// transaction id).
    ///
    /// # Errors
    ///
    /// [`CoffreError::Provider`] carrying the transport error or the
    /// endpoint's rejection text verbatim.
    pub fn broadcast(&self, raw_hex: &str, network: Network) -> Result<String> {
        let endpoint = self.endpoint(network)?;
        info!(%endpoint, bytes = raw_hex.len() / 2, "broadcasting transaction");

        let response = reqwest::blocking::Client::new()
            .post(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(raw_hex.to_owned())
            .send()
            .map_err(|e| CoffreError::Provider {
                reason: format!("broadcast to {endpoint} failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| CoffreError::Provider {
            reason: format!("broadcast response from {endpoint} unreadable: {e}"),
        })?;
        if !status.is_success() {
            return Err(CoffreError::Provider {
                reason: format!("{endpoint} returned {status}: {body}"),
            });
        }
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
