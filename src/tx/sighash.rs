//! Replay-protected signature hash: the BIP143 digest layout with
//! `SIGHASH_ALL | SIGHASH_FORKID` (fork id 0) as the type.

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, ScriptBuf, Transaction};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Shared midstate hashes for every input of one transaction.
pub struct SighashCache<'a> {
    tx: &'a Transaction,
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl<'a> SighashCache<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        let mut prevouts = Vec::with_capacity(tx.input.len() * 36);
        let mut sequences = Vec::with_capacity(tx.input.len() * 4);
        for input in &tx.input {
            prevouts.extend(serialize(&input.previous_output));
            sequences.extend(input.sequence.0.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for output in &tx.output {
            outputs.extend(serialize(output));
        }
        Self {
            tx,
            hash_prevouts: sha256d::Hash::hash(&prevouts).to_byte_array(),
            hash_sequence: sha256d::Hash::hash(&sequences).to_byte_array(),
            hash_outputs: sha256d::Hash::hash(&outputs).to_byte_array(),
        }
    }

    /// Preimage for `input_index` spending `value` locked by `script_code`.
    /// `None` when the transaction has no such input.
    pub fn preimage(&self, input_index: usize, script_code: &ScriptBuf, value: Amount) -> Option<Vec<u8>> {
        let input = self.tx.input.get(input_index)?;
        let mut buf = Vec::with_capacity(4 + 32 + 32 + 36 + 26 + 8 + 4 + 32 + 4 + 4);
        buf.extend(self.tx.version.0.to_le_bytes());
        buf.extend(self.hash_prevouts);
        buf.extend(self.hash_sequence);
        buf.extend(serialize(&input.previous_output));
        buf.extend(serialize(script_code));
        buf.extend(value.to_sat().to_le_bytes());
        buf.extend(input.sequence.0.to_le_bytes());
        buf.extend(self.hash_outputs);
        buf.extend(self.tx.lock_time.to_consensus_u32().to_le_bytes());
        buf.extend(SIGHASH_ALL_FORKID.to_le_bytes());
        Some(buf)
    }

    pub fn signature_hash(&self, input_index: usize, script_code: &ScriptBuf, value: Amount) -> Option<[u8; 32]> {
        let preimage = self.preimage(input_index, script_code, value)?;
        Some(sha256d::Hash::hash(&preimage).to_byte_array())
    }
}
