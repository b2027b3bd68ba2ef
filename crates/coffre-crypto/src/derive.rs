//! Hierarchical key derivation for Bitcoin and Ethereum accounts.
//!
//! Every account is addressed by a single non-hardened index and
//! expands into two fixed paths from the wallet seed:
//!
//! * Bitcoin: `m/84'/0'/0'/0/{index}` (BIP84, native SegWit)
//! * Ethereum: `m/44'/60'/0'/0/{index}` (BIP44)
//!
//! Process:
//! 1. Resolve the 64-byte BIP39 seed from the mnemonic.
//! 2. Build a master extended key for the selected network.
//! 3. Derive both paths and encode chain-native key material.

use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, PrivateKey};
use coffre_types::network::Network;
use coffre_types::{CoffreError, Result};
use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::mnemonic::Mnemonic;

/// Account indices are non-hardened path components.
pub const MAX_ACCOUNT_INDEX: u32 = (1 << 31) - 1;

// ---------------------------------------------------------------------------
// Derived key material
// ---------------------------------------------------------------------------

/// Ethereum key material for one account index.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EthKeys {
    /// 32-byte secret key, hex.
    pub private_key: String,
    /// 33-byte compressed public key, hex.
    pub public_key: String,
    /// 0x-prefixed lowercase 20-byte address.
    #[zeroize(skip)]
    pub address: String,
}

/// Bitcoin key material for one account index.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BtcKeys {
    /// 32-byte secret key, hex.
    pub private_key: String,
    /// Network-tagged WIF encoding of the same key.
    pub private_key_wif: String,
    /// 33-byte compressed public key, hex.
    pub public_key: String,
    /// Native SegWit (bech32) address.
    #[zeroize(skip)]
    pub address: String,
}

/// Both chains' key material for one account index.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChainKeys {
    pub eth: EthKeys,
    pub btc: BtcKeys,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Maps the vault-level network selector onto the Bitcoin chain enum.
pub fn bitcoin_network(network: Network) -> bitcoin::Network {
    match network {
        Network::Mainnet => bitcoin::Network::Bitcoin,
        Network::Testnet => bitcoin::Network::Testnet,
        Network::Regtest => bitcoin::Network::Regtest,
    }
}

/// Derives Bitcoin and Ethereum keys for `index` on `network`.
///
/// Deterministic: the same `(mnemonic, passphrase, index, network)`
/// always yields the same keys.
///
/// # Errors
///
/// [`CoffreError::Parameter`] if `index` exceeds [`MAX_ACCOUNT_INDEX`],
/// [`CoffreError::Signing`] if key derivation itself fails.
pub fn derive(mnemonic: &Mnemonic, index: u32, network: Network) -> Result<ChainKeys> {
    if index > MAX_ACCOUNT_INDEX {
        return Err(CoffreError::parameter(format!(
            "account index {index} exceeds maximum {MAX_ACCOUNT_INDEX}"
        )));
    }

    let mut seed = mnemonic.seed()?;
    let btc_network = bitcoin_network(network);
    let master = Xpriv::new_master(btc_network, &seed).map_err(|e| CoffreError::Signing {
        reason: format!("master key derivation failed: {e}"),
    })?;
    seed.zeroize();

    let btc = derive_btc(&master, index, btc_network)?;
    let eth = derive_eth(&master, index)?;
    Ok(ChainKeys { eth, btc })
}

fn child_key(master: &Xpriv, path: &str) -> Result<SecretKey> {
    let secp = Secp256k1::new();
    let path: DerivationPath = path.parse().map_err(|e| CoffreError::Signing {
        reason: format!("invalid derivation path: {e}"),
    })?;
    let child = master
        .derive_priv(&secp, &path)
        .map_err(|e| CoffreError::Signing {
            reason: format!("child key derivation failed: {e}"),
        })?;
    Ok(child.private_key)
}

fn derive_btc(master: &Xpriv, index: u32, network: bitcoin::Network) -> Result<BtcKeys> {
    let secp = Secp256k1::new();
    let secret = child_key(master, &format!("m/84'/0'/0'/0/{index}"))?;

    let private_key = PrivateKey::new(secret, network);
    let compressed = CompressedPublicKey(secret.public_key(&secp));
    let address = Address::p2wpkh(&compressed, network);

    Ok(BtcKeys {
        private_key: hex::encode(secret.secret_bytes()),
        private_key_wif: private_key.to_wif(),
        public_key: compressed.to_string(),
        address: address.to_string(),
    })
}

fn derive_eth(master: &Xpriv, index: u32) -> Result<EthKeys> {
    let secp = Secp256k1::new();
    let secret = child_key(master, &format!("m/44'/60'/0'/0/{index}"))?;
    let public = secret.public_key(&secp);

    // Keccak-256 over the 64-byte uncompressed point (tag byte dropped),
    // address is the last 20 bytes, rendered lowercase.
    let uncompressed = public.serialize_uncompressed();
    let digest = Keccak256::digest(&uncompressed[1..]);
    let address = format!("0x{}", hex::encode(&digest[12..]));

    Ok(EthKeys {
        private_key: hex::encode(secret.secret_bytes()),
        public_key: hex::encode(public.serialize()),
        address,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn mnemonic() -> Mnemonic {
        Mnemonic::import(MNEMONIC_12, None).unwrap()
    }

    /// BIP84 reference vectors for the canonical test mnemonic.
    #[test]
    fn btc_bip84_vectors() -> Result<()> {
        let keys = derive(&mnemonic(), 0, Network::Mainnet)?;
        assert_eq!(
            keys.btc.address,
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
        assert_eq!(
            keys.btc.private_key_wif,
            "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d"
        );
        assert_eq!(
            keys.btc.public_key,
            "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c"
        );

        let next = derive(&mnemonic(), 1, Network::Mainnet)?;
        assert_eq!(
            next.btc.address,
            "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g"
        );
        Ok(())
    }

    /// Widely published BIP44/60 vector for the canonical test mnemonic.
    #[test]
    fn eth_address_vector() -> Result<()> {
        let keys = derive(&mnemonic(), 0, Network::Mainnet)?;
        assert_eq!(
            keys.eth.address,
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
        Ok(())
    }

    #[test]
    fn eth_address_shape() -> Result<()> {
        let keys = derive(&mnemonic(), 3, Network::Mainnet)?;
        assert!(keys.eth.address.starts_with("0x"));
        assert_eq!(keys.eth.address.len(), 42);
        assert_eq!(keys.eth.address, keys.eth.address.to_lowercase());
        Ok(())
    }

    #[test]
    fn derivation_is_deterministic() -> Result<()> {
        let a = derive(&mnemonic(), 5, Network::Mainnet)?;
        let b = derive(&mnemonic(), 5, Network::Mainnet)?;
        assert_eq!(a.btc.address, b.btc.address);
        assert_eq!(a.eth.address, b.eth.address);
        Ok(())
    }

    #[test]
    fn distinct_indices_yield_distinct_keys() -> Result<()> {
        let a = derive(&mnemonic(), 0, Network::Mainnet)?;
        let b = derive(&mnemonic(), 1, Network::Mainnet)?;
        assert_ne!(a.btc.address, b.btc.address);
        assert_ne!(a.eth.address, b.eth.address);
        assert_ne!(a.btc.private_key, b.btc.private_key);
        Ok(())
    }

    #[test]
    fn passphrase_changes_derived_keys() -> Result<()> {
        let guarded = Mnemonic::import(MNEMONIC_12, Some("TREZOR".into()))?;
        let a = derive(&mnemonic(), 0, Network::Mainnet)?;
        let b = derive(&guarded, 0, Network::Mainnet)?;
        assert_ne!(a.btc.address, b.btc.address);
        assert_ne!(a.eth.address, b.eth.address);
        Ok(())
    }

    #[test]
    fn testnet_addresses_use_testnet_encoding() -> Result<()> {
        let keys = derive(&mnemonic(), 0, Network::Testnet)?;
        assert!(keys.btc.address.starts_with("tb1"));
        // ETH addresses are network-independent.
        assert_eq!(
            keys.eth.address,
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
        Ok(())
    }

    #[test]
    fn rejects_hardened_range_index() {
        let err = derive(&mnemonic(), 1 << 31, Network::Mainnet);
        assert!(matches!(err, Err(CoffreError::Parameter { .. })));
    }
}
