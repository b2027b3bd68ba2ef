//! One derivation index expanded into both chains' addresses.

use coffre_crypto::derive;
use coffre_crypto::mnemonic::Mnemonic;
use coffre_types::network::Network;
use coffre_types::Result;

use crate::address::{BtcAddress, ChainAddress, EthAddress};

/// An account inside a wallet: a derivation index, an alias, and the
/// two chain addresses materialized from the wallet mnemonic.
#[derive(Clone)]
pub struct Account {
    pub index: u32,
    pub alias: String,
    pub eth: EthAddress,
    pub btc: BtcAddress,
}

impl Account {
    /// Derives both chains' addresses for `index` from `mnemonic`.
    pub fn derive(alias: &str, index: u32, mnemonic: &Mnemonic, network: Network) -> Result<Self> {
        let keys = derive::derive(mnemonic, index, network)?;
        Ok(Self {
            index,
            alias: alias.to_owned(),
            eth: EthAddress {
                alias: alias.to_owned(),
                keys: keys.eth.clone(),
            },
            btc: BtcAddress {
                alias: alias.to_owned(),
                keys: keys.btc.clone(),
            },
        })
    }

    /// Returns both addresses for chain-agnostic listing.
    pub fn addresses(&self) -> [ChainAddress; 2] {
        [
            ChainAddress::Eth(self.eth.clone()),
            ChainAddress::Btc(self.btc.clone()),
        ]
    }
}
