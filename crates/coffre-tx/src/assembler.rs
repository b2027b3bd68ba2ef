//! Unsigned transaction construction, per-input signing, and size calc.
//!
//! Inputs are the caller's UTXOs in the order given; the recipient
//! output comes first and a change output back to the sender is added
//! only when `sum(values) - fee - amount` is strictly positive. Input
//! coverage is upstream validation's job, not the assembler's.

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use coffre_crypto::derive::bitcoin_network;
use coffre_types::{CoffreError, Result};
use coffre_wallet::address::{BtcAddress, ChainAddress};
use tracing::debug;

// ---------------------------------------------------------------------------
// Utxo
// ---------------------------------------------------------------------------

/// An unspent output reference, externally supplied as
/// `hash:index:value` (value in satoshis).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
}

impl FromStr for Utxo {
    type Err = CoffreError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (Some(hash), Some(index), Some(value), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CoffreError::parameter(format!(
                "invalid UTXO {s:?}: expected hash:index:value"
            )));
        };
        let txid = Txid::from_str(hash)
            .map_err(|e| CoffreError::parameter(format!("invalid UTXO hash {hash:?}: {e}")))?;
        let vout: u32 = index
            .parse()
            .map_err(|e| CoffreError::parameter(format!("invalid UTXO index {index:?}: {e}")))?;
        let value: u64 = value
            .parse()
            .map_err(|e| CoffreError::parameter(format!("invalid UTXO value {value:?}: {e}")))?;
        Ok(Self { txid, vout, value })
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Builds an unsigned transaction spending `utxos` from `sender`.
///
/// # Process
///
/// 1. Validate the recipient address against the selected network.
/// 2. Add one input per UTXO, in the order given.
/// 3. Add the recipient output for `amount`.
/// 4. Add a change output back to the sender for
///    `sum(values) - fee - amount`, only if strictly positive.
///
/// # Errors
///
/// [`CoffreError::Parameter`] for an empty UTXO set, a zero amount, a
/// malformed recipient address, or one on the wrong network.
pub fn create_transaction(
    sender: &BtcAddress,
    to: &str,
    amount: u64,
    fee: u64,
    utxos: &[Utxo],
    network: coffre_types::network::Network,
) -> Result<Transaction> {
    if utxos.is_empty() {
        return Err(CoffreError::parameter("at least one UTXO is required"));
    }
    if amount == 0 {
        return Err(CoffreError::parameter("amount must be positive"));
    }

    let btc_network = bitcoin_network(network);
    let recipient = parse_address(to, btc_network)?;
    let sender_addr = parse_address(sender.address(), btc_network)?;

    let input = utxos
        .iter()
        .map(|utxo| TxIn {
            previous_output: OutPoint {
                txid: utxo.txid,
                vout: utxo.vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        })
        .collect();

    let mut output = vec![TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: recipient.script_pubkey(),
    }];

    let total: u64 = utxos.iter().map(|u| u.value).sum();
    let spent = amount
        .checked_add(fee)
        .ok_or_else(|| CoffreError::parameter("amount + fee overflows"))?;
    // Zero or negative remainder means no change output; whether the
    // inputs actually cover the spend is validated upstream.
    if total > spent {
        output.push(TxOut {
            value: Amount::from_sat(total - spent),
            script_pubkey: sender_addr.script_pubkey(),
        });
    }

    debug!(
        inputs = utxos.len(),
        outputs = output.len(),
        amount,
        fee,
        "assembled unsigned transaction"
    );

    Ok(Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    })
}

/// Signs every input of `tx` and returns the raw transaction hex.
///
/// Each input is signed with the address's private key against its
/// UTXO's value, and the signature is verified against the derived
/// public key before the witness is attached.
///
/// # Errors
///
/// - [`CoffreError::Signing`] for an Ethereum address (unsupported),
///   malformed key material, or a signature that fails verification.
/// - [`CoffreError::Parameter`] if `utxos` does not match the inputs.
pub fn sign(
    tx: Transaction,
    address: &ChainAddress,
    utxos: &[Utxo],
    network: coffre_types::network::Network,
) -> Result<String> {
    let sender = match address {
        ChainAddress::Btc(btc) => btc,
        ChainAddress::Eth(_) => {
            return Err(CoffreError::Signing {
                reason: "signing is not supported for ETH addresses".into(),
            })
        }
    };
    if tx.input.len() != utxos.len() {
        return Err(CoffreError::parameter(format!(
            "transaction has {} inputs but {} UTXOs were supplied",
            tx.input.len(),
            utxos.len()
        )));
    }

    let secp = Secp256k1::new();
    let secret = decode_secret(&sender.keys.private_key)?;
    let public = decode_public(&sender.keys.public_key)?;
    let script_pubkey = parse_address(sender.address(), bitcoin_network(network))?.script_pubkey();

    let mut tx = tx;
    let mut cache = SighashCache::new(&tx);
    let mut signatures = Vec::with_capacity(utxos.len());
    for (i, utxo) in utxos.iter().enumerate() {
        let sighash = cache
            .p2wpkh_signature_hash(
                i,
                &script_pubkey,
                Amount::from_sat(utxo.value),
                EcdsaSighashType::All,
            )
            .map_err(|e| CoffreError::Signing {
                reason: format!("sighash computation failed for input {i}: {e}"),
            })?;
        let message = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_ecdsa(&message, &secret);

        // Verify immediately; a bad signature must never be finalized.
        secp.verify_ecdsa(&message, &signature, &public)
            .map_err(|e| CoffreError::Signing {
                reason: format!("signature verification failed for input {i}: {e}"),
            })?;
        signatures.push(signature);
    }
    drop(cache);

    for (txin, signature) in tx.input.iter_mut().zip(signatures) {
        let wire = bitcoin::ecdsa::Signature {
            signature,
            sighash_type: EcdsaSighashType::All,
        };
        txin.witness = Witness::p2wpkh(&wire, &public);
    }

    Ok(encode::serialize_hex(&tx))
}

/// Parses a raw transaction and returns its virtual size
/// (`ceil(weight / 4)`), for effective fee-rate display.
///
/// # Errors
///
/// [`CoffreError::Parameter`] for non-hex or undecodable input.
pub fn calc_vsize(raw_hex: &str) -> Result<u64> {
    let bytes = hex::decode(raw_hex)
        .map_err(|e| CoffreError::parameter(format!("invalid transaction hex: {e}")))?;
    let tx: Transaction = encode::deserialize(&bytes)
        .map_err(|e| CoffreError::parameter(format!("undecodable transaction: {e}")))?;
    Ok(tx.weight().to_vbytes_ceil())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_address(s: &str, network: Network) -> Result<Address> {
    s.parse::<Address<_>>()
        .map_err(|e| CoffreError::parameter(format!("invalid address {s:?}: {e}")))?
        .require_network(network)
        .map_err(|e| CoffreError::parameter(format!("address {s:?}: {e}")))
}

fn decode_secret(hex_key: &str) -> Result<SecretKey> {
    let bytes = hex::decode(hex_key).map_err(|e| CoffreError::Signing {
        reason: format!("invalid private key hex: {e}"),
    })?;
    SecretKey::from_slice(&bytes).map_err(|e| CoffreError::Signing {
        reason: format!("invalid private key: {e}"),
    })
}

fn decode_public(hex_key: &str) -> Result<PublicKey> {
    let bytes = hex::decode(hex_key).map_err(|e| CoffreError::Signing {
        reason: format!("invalid public key hex: {e}"),
    })?;
    PublicKey::from_slice(&bytes).map_err(|e| CoffreError::Signing {
        reason: format!("invalid public key: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use coffre_crypto::derive;
    use coffre_crypto::mnemonic::Mnemonic;
    use coffre_types::network::Network as VaultNetwork;
    use coffre_wallet::address::{BtcAddress, EthAddress};

    const MNEMONIC_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn sender() -> BtcAddress {
        let mnemonic = Mnemonic::import(MNEMONIC_12, None).unwrap();
        let keys = derive::derive(&mnemonic, 0, VaultNetwork::Mainnet).unwrap();
        BtcAddress {
            alias: "default".into(),
            keys: keys.btc.clone(),
        }
    }

    fn recipient() -> String {
        let mnemonic = Mnemonic::import(MNEMONIC_12, None).unwrap();
        let keys = derive::derive(&mnemonic, 1, VaultNetwork::Mainnet).unwrap();
        keys.btc.address.clone()
    }

    fn utxo(vout: u32, value: u64) -> Utxo {
        Utxo {
            txid: Txid::from_str(
                "1111111111111111111111111111111111111111111111111111111111111111",
            )
            .unwrap(),
            vout,
            value,
        }
    }

    #[test]
    fn parses_utxo_spec() {
        let u: Utxo =
            "1111111111111111111111111111111111111111111111111111111111111111:3:150000"
                .parse()
                .unwrap();
        assert_eq!(u.vout, 3);
        assert_eq!(u.value, 150_000);
    }

    #[test]
    fn rejects_malformed_utxo_specs() {
        for bad in ["", "abc", "xy:0:1", "11:0", "11:0:1:9", "11:one:2"] {
            assert!(
                matches!(bad.parse::<Utxo>(), Err(CoffreError::Parameter { .. })),
                "UTXO spec {bad:?} should be rejected"
            );
        }
    }

    /// 150,000 in, amount 100,000, fee 1,000 → recipient output plus
    /// 49,000 change back to the sender.
    #[test]
    fn change_output_when_remainder_positive() {
        let sender = sender();
        let utxos = [utxo(0, 100_000), utxo(1, 50_000)];
        let tx = create_transaction(
            &sender,
            &recipient(),
            100_000,
            1_000,
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();

        assert_eq!(tx.input.len(), 2);
        assert_eq!(tx.output.len(), 2);
        assert_eq!(tx.output[0].value, Amount::from_sat(100_000));
        assert_eq!(tx.output[1].value, Amount::from_sat(49_000));

        let sender_spk = parse_address(sender.address(), Network::Bitcoin)
            .unwrap()
            .script_pubkey();
        assert_eq!(tx.output[1].script_pubkey, sender_spk);
    }

    /// Inputs equal to amount + fee → exactly one output, no change.
    #[test]
    fn no_change_output_when_exact() {
        let tx = create_transaction(
            &sender(),
            &recipient(),
            100_000,
            1_000,
            &[utxo(0, 101_000)],
            VaultNetwork::Mainnet,
        )
        .unwrap();
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.output[0].value, Amount::from_sat(100_000));
    }

    #[test]
    fn rejects_empty_utxos_and_zero_amount() {
        assert!(create_transaction(
            &sender(),
            &recipient(),
            100,
            1,
            &[],
            VaultNetwork::Mainnet
        )
        .is_err());
        assert!(create_transaction(
            &sender(),
            &recipient(),
            0,
            1,
            &[utxo(0, 100)],
            VaultNetwork::Mainnet
        )
        .is_err());
    }

    #[test]
    fn rejects_wrong_network_recipient() {
        // Testnet recipient on a mainnet transaction.
        let err = create_transaction(
            &sender(),
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
            100,
            1,
            &[utxo(0, 1_000)],
            VaultNetwork::Mainnet,
        );
        assert!(matches!(err, Err(CoffreError::Parameter { .. })));
    }

    #[test]
    fn sign_produces_decodable_witness_transaction() {
        let sender = sender();
        let utxos = [utxo(0, 100_000), utxo(1, 50_000)];
        let tx = create_transaction(
            &sender,
            &recipient(),
            100_000,
            1_000,
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();

        let raw = sign(
            tx,
            &ChainAddress::Btc(sender),
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();

        let decoded: Transaction = encode::deserialize(&hex::decode(&raw).unwrap()).unwrap();
        assert_eq!(decoded.input.len(), 2);
        for txin in &decoded.input {
            // P2WPKH witness: signature + public key.
            assert_eq!(txin.witness.len(), 2);
        }
    }

    #[test]
    fn signing_with_eth_address_is_refused() {
        let mnemonic = Mnemonic::import(MNEMONIC_12, None).unwrap();
        let keys = derive::derive(&mnemonic, 0, VaultNetwork::Mainnet).unwrap();
        let eth = ChainAddress::Eth(EthAddress {
            alias: "default".into(),
            keys: keys.eth.clone(),
        });
        let utxos = [utxo(0, 101_000)];
        let tx = create_transaction(
            &sender(),
            &recipient(),
            100_000,
            1_000,
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();

        let err = sign(tx, &eth, &utxos, VaultNetwork::Mainnet);
        assert!(matches!(err, Err(CoffreError::Signing { .. })));
    }

    #[test]
    fn utxo_count_must_match_inputs() {
        let sender = sender();
        let utxos = [utxo(0, 101_000)];
        let tx = create_transaction(
            &sender,
            &recipient(),
            100_000,
            1_000,
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();
        let err = sign(tx, &ChainAddress::Btc(sender), &[], VaultNetwork::Mainnet);
        assert!(matches!(err, Err(CoffreError::Parameter { .. })));
    }

    #[test]
    fn vsize_of_signed_transaction() {
        let sender = sender();
        let utxos = [utxo(0, 101_000)];
        let tx = create_transaction(
            &sender,
            &recipient(),
            100_000,
            1_000,
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();
        let raw = sign(
            tx,
            &ChainAddress::Btc(sender),
            &utxos,
            VaultNetwork::Mainnet,
        )
        .unwrap();

        let vsize = calc_vsize(&raw).unwrap();
        // One P2WPKH input, one output: roughly 110 vbytes.
        assert!((80..200).contains(&vsize), "unexpected vsize {vsize}");
    }

    #[test]
    fn vsize_rejects_garbage() {
        assert!(calc_vsize("zz").is_err());
        assert!(calc_vsize("00").is_err());
    }
}
