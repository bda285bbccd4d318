//! Seed - the wallet root secret. Generated once per owner, handed to storage
//! only in sealed form.

mod seal;

use crate::error::{WalletError, WalletResult};
use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

pub use seal::{migrate_legacy, obscure, reveal, reveal_legacy};

/// 128 bits of entropy → 12 words.
pub const ENTROPY_BYTES: usize = 16;

/// A validated BIP39 mnemonic. `Debug` never prints the words.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSeed {
    mnemonic: Mnemonic,
}

impl WalletSeed {
    /// Fresh 12-word mnemonic from the OS CSPRNG.
    pub fn generate() -> WalletResult<Self> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
        OsRng
            .try_fill_bytes(entropy.as_mut())
            .map_err(|e| WalletError::InvalidSeed(format!("entropy source: {}", e)))?;
        let mnemonic = Mnemonic::from_entropy(entropy.as_ref())
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;
        Ok(Self { mnemonic })
    }

    /// Normalizes whitespace and case, checks word count and checksum.
    pub fn parse(phrase: &str) -> WalletResult<Self> {
        let normalized = Zeroizing::new(
            phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
        );
        let mnemonic = Mnemonic::parse_normalized(&normalized)
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;
        Ok(Self { mnemonic })
    }

    pub fn word_count(&self) -> usize {
        self.mnemonic.word_count()
    }

    pub fn phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.mnemonic.to_string())
    }

    /// BIP39 seed bytes with an empty passphrase.
    pub fn to_seed_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.mnemonic.to_seed(""))
    }

    pub fn seal(&self, secret: &str) -> WalletResult<String> {
        obscure(&self.phrase(), secret)
    }

    pub fn unseal(sealed: &str, secret: &str) -> WalletResult<Self> {
        let phrase = reveal(sealed, secret)?;
        Self::parse(&phrase)
    }
}

impl fmt::Debug for WalletSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSeed({} words, redacted)", self.word_count())
    }
}
