//! Sealing a mnemonic for storage.
//!
//! Format: base64(`0x02 || nonce (24) || XChaCha20-Poly1305 ciphertext+tag`),
//! key = SHA256(secret). A wrong secret fails the tag check.
//!
//! Blobs written by the previous XOR keystream scheme (no version byte, no tag)
//! can still be opened with [`reveal_legacy`] and resealed with [`migrate_legacy`].

use crate::error::{WalletError, WalletResult};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const SEAL_VERSION: u8 = 0x02;
const NONCE_LEN: usize = 24;
const AAD: &[u8] = b"cashdrop-mnemonic";

fn derive_key(secret: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(secret.as_bytes()).into())
}

fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Seal `mnemonic` under `secret`. Non-deterministic: each call draws a fresh nonce.
pub fn obscure(mnemonic: &str, secret: &str) -> WalletResult<String> {
    let key = derive_key(secret);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_ref()));

    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| WalletError::InvalidSeed(format!("entropy source: {}", e)))?;

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            chacha20poly1305::aead::Payload { msg: mnemonic.as_bytes(), aad: AAD },
        )
        .map_err(|_| WalletError::SeedDecryption)?;

    let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    blob.push(SEAL_VERSION);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(b64().encode(blob))
}

/// Open a blob produced by [`obscure`].
pub fn reveal(sealed: &str, secret: &str) -> WalletResult<Zeroizing<String>> {
    let blob = b64().decode(sealed.trim()).map_err(|_| WalletError::SeedDecryption)?;
    if blob.len() < 1 + NONCE_LEN || blob[0] != SEAL_VERSION {
        return Err(WalletError::SeedDecryption);
    }
    let (nonce, ciphertext) = blob[1..].split_at(NONCE_LEN);

    let key = derive_key(secret);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                XNonce::from_slice(nonce),
                chacha20poly1305::aead::Payload { msg: ciphertext, aad: AAD },
            )
            .map_err(|_| WalletError::SeedDecryption)?,
    );
    let phrase = std::str::from_utf8(&plaintext).map_err(|_| WalletError::SeedDecryption)?;
    Ok(Zeroizing::new(phrase.to_string()))
}

/// Open a blob written by the old XOR keystream (`byte ^ SHA256(secret)[i % 32]`).
///
/// There is no integrity check in that format, so a wrong secret can only be
/// caught by the result not parsing as a mnemonic.
pub fn reveal_legacy(ciphertext: &str, secret: &str) -> WalletResult<Zeroizing<String>> {
    let data = Zeroizing::new(
        b64()
            .decode(ciphertext.trim())
            .map_err(|e| WalletError::InvalidSeed(format!("legacy base64: {}", e)))?,
    );
    let key = derive_key(secret);
    let plain: Zeroizing<Vec<u8>> =
        Zeroizing::new(data.iter().enumerate().map(|(i, b)| b ^ key[i % key.len()]).collect());
    let phrase = std::str::from_utf8(&plain)
        .map_err(|_| WalletError::InvalidSeed("legacy blob did not decode to text".into()))?;
    bip39::Mnemonic::parse_normalized(phrase)
        .map_err(|e| WalletError::InvalidSeed(format!("legacy blob: {}", e)))?;
    Ok(Zeroizing::new(phrase.to_string()))
}

/// Reveal a legacy blob and reseal it in the current format.
pub fn migrate_legacy(ciphertext: &str, secret: &str) -> WalletResult<String> {
    let phrase = reveal_legacy(ciphertext, secret)?;
    tracing::info!("migrated legacy sealed seed");
    obscure(&phrase, secret)
}
