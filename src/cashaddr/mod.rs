//! CashAddr - checksummed, charset-encoded P2PKH addresses
//!
//! ```text
//! [version 0x00 | hash160 (20 bytes)]  --bytes_to_fes-->  payload symbols
//!                                                          │
//! prefix chars & 0x1f, 0, payload, 0×8  --polymod-->  8 checksum symbols
//!                                                          │
//! "bitcoincash:" + charset[payload ++ checksum]  <─────────┘
//! ```
//!
//! The checksum is a BCH code over GF(2^5) with a 40-bit state; any single
//! substitution in the payload is detected.

mod checksum;

use crate::error::{WalletError, WalletResult};
use crate::network::Network;
use bitcoin::bech32::primitives::iter::{ByteIterExt, Fe32IterExt};
use bitcoin::bech32::Fe32;
use checksum::CHECKSUM_LEN;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use checksum::polymod;

/// Version byte for P2PKH with a 160-bit hash (type 0, size 0).
pub const VERSION_P2PKH: u8 = 0x00;

const HASH_LEN: usize = 20;

/// A decoded P2PKH address: the network it belongs to and the pubkey hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CashAddress {
    pub network: Network,
    pub hash: [u8; HASH_LEN],
}

impl CashAddress {
    pub fn new(hash: [u8; HASH_LEN], network: Network) -> Self {
        Self { network, hash }
    }

    /// Parses with or without the `prefix:` part.
    pub fn parse(address: &str) -> WalletResult<Self> {
        decode(address)
    }

    /// Parses and requires the address to belong to `network`.
    pub fn parse_for(address: &str, network: Network) -> WalletResult<Self> {
        let parsed = decode(address)?;
        parsed.require_network(network)?;
        Ok(parsed)
    }

    pub fn require_network(&self, network: Network) -> WalletResult<()> {
        if self.network != network {
            return Err(WalletError::NetworkMismatch { expected: network, actual: self.network });
        }
        Ok(())
    }

    /// Payload and checksum without the `prefix:` part (what block explorers key on).
    pub fn payload(&self) -> String {
        let full = self.to_string();
        match full.split_once(':') {
            Some((_, payload)) => payload.to_string(),
            None => full,
        }
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Display for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.hash, self.network))
    }
}

impl std::str::FromStr for CashAddress {
    type Err = WalletError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl Serialize for CashAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CashAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Encode a 20-byte pubkey hash as a prefixed CashAddr string.
pub fn encode(hash160: &[u8; HASH_LEN], network: Network) -> String {
    let prefix = network.cashaddr_prefix();
    let payload: Vec<Fe32> = std::iter::once(VERSION_P2PKH).chain(hash160.iter().copied()).bytes_to_fes().collect();
    let checksum = checksum::create(prefix, &payload);

    let mut out = String::with_capacity(prefix.len() + 1 + payload.len() + CHECKSUM_LEN);
    out.push_str(prefix);
    out.push(':');
    out.extend(payload.iter().chain(checksum.iter()).map(|fe| fe.to_char()));
    out
}

/// Decode a CashAddr string. When the prefix is omitted every known network
/// prefix is tried and the one whose checksum verifies wins.
pub fn decode(address: &str) -> WalletResult<CashAddress> {
    let trimmed = address.trim();
    let has_lower = trimmed.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = trimmed.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(WalletError::InvalidAddress(format!("mixed case: {}", trimmed)));
    }
    let lowered = trimmed.to_ascii_lowercase();

    match lowered.split_once(':') {
        Some((prefix, payload)) => {
            let network = Network::from_prefix(prefix)
                .ok_or_else(|| WalletError::InvalidAddress(format!("unknown prefix: {}", prefix)))?;
            decode_payload(payload, network, &lowered)
        }
        None => {
            let fes = to_fes(&lowered)?;
            let network = Network::ALL
                .into_iter()
                .find(|n| checksum::verify(n.cashaddr_prefix(), &fes))
                .ok_or_else(|| WalletError::InvalidChecksum(lowered.clone()))?;
            decode_payload(&lowered, network, &lowered)
        }
    }
}

fn decode_payload(payload: &str, network: Network, original: &str) -> WalletResult<CashAddress> {
    let fes = to_fes(payload)?;
    if fes.len() <= CHECKSUM_LEN {
        return Err(WalletError::InvalidAddress(format!("too short: {}", original)));
    }
    if !checksum::verify(network.cashaddr_prefix(), &fes) {
        return Err(WalletError::InvalidChecksum(original.to_string()));
    }

    let data = &fes[..fes.len() - CHECKSUM_LEN];
    if !padding_is_clean(data) {
        return Err(WalletError::InvalidAddress(format!("bad padding: {}", original)));
    }
    let bytes: Vec<u8> = data.iter().copied().fes_to_bytes().collect();
    let (version, hash) = bytes
        .split_first()
        .ok_or_else(|| WalletError::InvalidAddress(format!("empty payload: {}", original)))?;
    if *version != VERSION_P2PKH {
        return Err(WalletError::UnsupportedAddressType(*version));
    }
    let hash: [u8; HASH_LEN] = hash
        .try_into()
        .map_err(|_| WalletError::InvalidAddress(format!("hash is {} bytes: {}", hash.len(), original)))?;
    Ok(CashAddress { network, hash })
}

fn to_fes(payload: &str) -> WalletResult<Vec<Fe32>> {
    payload
        .chars()
        .map(|c| Fe32::from_char(c).map_err(|_| WalletError::InvalidAddress(format!("invalid character '{}'", c))))
        .collect()
}

/// `fes_to_bytes` drops trailing bits, so they must be fewer than one symbol
/// and all zero.
fn padding_is_clean(data: &[Fe32]) -> bool {
    let spare = (data.len() * 5) % 8;
    if spare >= 5 {
        return false;
    }
    match data.last() {
        Some(last) => last.to_u8() & ((1u8 << spare) - 1) == 0,
        None => true,
    }
}
