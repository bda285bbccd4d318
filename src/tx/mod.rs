//! Tx - consolidating P2PKH transactions
//!
//! Many inputs (possibly from many derivation indices), exactly one output,
//! no change: `sum(inputs) = output + fee`, all in integer satoshis.
//!
//! ```text
//! [SweepInput{utxo, key}] ──▶ unsigned tx ──▶ per-input forkid sighash ──▶ ECDSA (RFC6979)
//!                                                                         │
//!                            raw hex ◀── consensus serialize ◀── <sig 0x41> <pubkey>
//! ```

mod sighash;

pub use sighash::{SighashCache, SIGHASH_ALL_FORKID};

use crate::cashaddr::CashAddress;
use crate::chain::Utxo;
use crate::error::{WalletError, WalletResult};
use crate::keys::DerivedKeyPair;
use crate::network::Network;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, PubkeyHash, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::debug;

/// One UTXO together with the key that controls it.
#[derive(Debug, Clone)]
pub struct SweepInput {
    pub utxo: Utxo,
    pub key: DerivedKeyPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub raw_hex: String,
    pub txid: String,
    pub total_in_sats: u64,
    pub amount_out_sats: u64,
    pub fee_sats: u64,
    pub input_count: usize,
}

/// Standard `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2pkh_script(hash160: &[u8; 20]) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(*hash160))
}

/// Build one transaction spending every input to `destination`, minus `fee_sats`.
///
/// Fails before any signing when inputs are empty, the total does not exceed
/// the fee, the destination is on another network, a key does not control
/// its UTXO, or an outpoint appears twice.
pub fn build_and_sign(
    inputs: &[SweepInput],
    destination: &CashAddress,
    fee_sats: u64,
    network: Network,
) -> WalletResult<SignedTransaction> {
    if inputs.is_empty() {
        return Err(WalletError::NoUtxos);
    }
    destination.require_network(network)?;

    let mut total_in: u64 = 0;
    for (i, input) in inputs.iter().enumerate() {
        input.utxo.address.require_network(network)?;
        if input.key.network != network || input.key.address() != input.utxo.address {
            return Err(WalletError::KeyMismatch { input: i, address: input.utxo.address.to_string() });
        }
        total_in = total_in
            .checked_add(input.utxo.value_sats)
            .ok_or_else(|| WalletError::Signing("input total overflows".into()))?;
    }
    if total_in <= fee_sats {
        return Err(WalletError::InsufficientFunds { available: total_in, fee: fee_sats });
    }
    let amount_out = total_in - fee_sats;

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|input| {
                let txid = Txid::from_str(&input.utxo.txid)
                    .map_err(|e| WalletError::Signing(format!("utxo txid {}: {}", input.utxo.txid, e)))?;
                Ok(TxIn {
                    previous_output: OutPoint { txid, vout: input.utxo.output_index },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
            })
            .collect::<WalletResult<Vec<_>>>()?,
        output: vec![TxOut {
            value: Amount::from_sat(amount_out),
            script_pubkey: p2pkh_script(&destination.hash),
        }],
    };

    let mut seen = HashSet::with_capacity(tx.input.len());
    for txin in &tx.input {
        if !seen.insert(txin.previous_output) {
            return Err(WalletError::DuplicateInput(txin.previous_output.to_string()));
        }
    }

    let secp = Secp256k1::signing_only();
    let script_sigs = {
        let cache = SighashCache::new(&tx);
        inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let script_code = p2pkh_script(&input.key.pubkey_hash());
                let digest = cache
                    .signature_hash(i, &script_code, Amount::from_sat(input.utxo.value_sats))
                    .ok_or_else(|| WalletError::Signing(format!("no input {}", i)))?;
                let signature = secp.sign_ecdsa(&Message::from_digest(digest), &input.key.secret_key);

                let mut sig_bytes = signature.serialize_der().to_vec();
                sig_bytes.push(SIGHASH_ALL_FORKID as u8);
                let sig_push = PushBytesBuf::try_from(sig_bytes)
                    .map_err(|e| WalletError::Signing(format!("signature push: {}", e)))?;
                Ok(Builder::new()
                    .push_slice(sig_push)
                    .push_key(&bitcoin::PublicKey::new(input.key.public_key))
                    .into_script())
            })
            .collect::<WalletResult<Vec<_>>>()?
    };
    for (txin, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        txin.script_sig = script_sig;
    }

    let txid = tx.compute_txid().to_string();
    debug!(%txid, inputs = inputs.len(), total_in, amount_out, fee = fee_sats, "signed sweep transaction");

    Ok(SignedTransaction {
        raw_hex: serialize_hex(&tx),
        txid,
        total_in_sats: total_in,
        amount_out_sats: amount_out,
        fee_sats,
        input_count: inputs.len(),
    })
}
