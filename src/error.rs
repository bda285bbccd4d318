//! Errors - one taxonomy for the engine, one for the provider boundary.
//!
//! Derivation and decode errors are caller bugs and are never retried.
//! Read paths (monitor, UTXO fetch) swallow `ChainError` and degrade to empty;
//! write paths (sign, broadcast) always surface a `WalletError`.

use crate::network::Network;

pub type WalletResult<T> = Result<T, WalletError>;
pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("Invalid derivation index: {0}")]
    InvalidIndex(String),
    #[error("Invalid checksum for address {0}")]
    InvalidChecksum(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Unsupported address type: version byte {0:#04x}")]
    UnsupportedAddressType(u8),
    #[error("Network mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: Network, actual: Network },
    #[error("Key for input {input} does not control {address}")]
    KeyMismatch { input: usize, address: String },
    #[error("Derived address at index {index} does not match {address}")]
    AddressMismatch { index: u32, address: String },
    #[error("Insufficient funds: {available} sats available, fee is {fee} sats")]
    InsufficientFunds { available: u64, fee: u64 },
    #[error("No spendable outputs found")]
    NoUtxos,
    #[error("Outpoint {0} is spent more than once")]
    DuplicateInput(String),
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),
    #[error("Broadcast unreachable: {0}")]
    BroadcastUnreachable(String),
    #[error("Sealed seed could not be opened")]
    SeedDecryption,
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Config: {0}")]
    Config(String),
}

/// Failures talking to the block-data provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Timeout
        } else if e.is_decode() {
            ChainError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ChainError::Status(status.as_u16())
        } else {
            ChainError::Transport(e.to_string())
        }
    }
}
