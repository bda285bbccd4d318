//! Keys - BIP32/BIP44 derivation from the wallet seed.
//!
//! ```text
//! mnemonic ──BIP39──▶ seed ──BIP32──▶ m
//!                                     ├── m/44'/145'/0'                 AccountKey (xpub for display)
//!                                     └── m/44'/{coin}'/0'/0/{index}    DerivedKeyPair → CashAddress
//! ```
//!
//! Everything is re-derived from the seed on demand; there is no detached-xpub
//! derivation path, so the two can never be mixed.

mod allocator;

use crate::cashaddr::CashAddress;
use crate::error::{WalletError, WalletResult};
use crate::network::Network;
use crate::seed::WalletSeed;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt;

pub use allocator::{AtomicIndexAllocator, IndexAllocator};

const PURPOSE: u32 = 44;
const ACCOUNT: u32 = 0;
const EXTERNAL_CHAIN: u32 = 0;

/// Highest usable receive index (non-hardened range).
pub const MAX_INDEX: u32 = (1 << 31) - 1;

/// `m/44'/145'/0'` - the anchor of every receive address of a wallet.
#[derive(Clone)]
pub struct AccountKey {
    pub xpriv: Xpriv,
    pub xpub: Xpub,
}

impl AccountKey {
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.xpub.public_key.serialize())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey").field("xpub", &self.xpub.to_string()).finish_non_exhaustive()
    }
}

/// Key pair at one receive index. The secret only leaves to sign.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKeyPair {
    pub index: u32,
    pub network: Network,
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl DerivedKeyPair {
    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.public_key)
    }

    pub fn address(&self) -> CashAddress {
        CashAddress::new(self.pubkey_hash(), self.network)
    }
}

impl fmt::Debug for DerivedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeyPair")
            .field("index", &self.index)
            .field("network", &self.network)
            .field("public_key", &self.public_key.to_string())
            .finish_non_exhaustive()
    }
}

/// RIPEMD160(SHA256(compressed pubkey)).
pub fn hash160(public_key: &PublicKey) -> [u8; 20] {
    hash160::Hash::hash(&public_key.serialize()).to_byte_array()
}

fn master_key(seed: &WalletSeed) -> WalletResult<Xpriv> {
    let seed_bytes = seed.to_seed_bytes();
    Xpriv::new_master(bitcoin::Network::Bitcoin, seed_bytes.as_ref())
        .map_err(|e| WalletError::InvalidSeed(format!("master key: {}", e)))
}

fn hardened(i: u32) -> WalletResult<ChildNumber> {
    ChildNumber::from_hardened_idx(i).map_err(|e| WalletError::InvalidIndex(e.to_string()))
}

fn account_path(network: Network) -> WalletResult<Vec<ChildNumber>> {
    Ok(vec![hardened(PURPOSE)?, hardened(network.coin_type())?, hardened(ACCOUNT)?])
}

/// Account key at `m/44'/145'/0'`.
pub fn derive_account_key(seed: &WalletSeed) -> WalletResult<AccountKey> {
    derive_account_key_for(seed, Network::Mainnet)
}

/// Account key for either network's coin type.
pub fn derive_account_key_for(seed: &WalletSeed, network: Network) -> WalletResult<AccountKey> {
    let secp = Secp256k1::new();
    let path = DerivationPath::from(account_path(network)?);
    let xpriv = master_key(seed)?
        .derive_priv(&secp, &path)
        .map_err(|e| WalletError::InvalidSeed(format!("account derivation: {}", e)))?;
    let xpub = Xpub::from_priv(&secp, &xpriv);
    Ok(AccountKey { xpriv, xpub })
}

/// Key pair at `m/44'/coin'/0'/0/index`. Same inputs, same output.
pub fn derive_key_pair(seed: &WalletSeed, index: u32, network: Network) -> WalletResult<DerivedKeyPair> {
    if index > MAX_INDEX {
        return Err(WalletError::InvalidIndex(format!("{} is outside 0..={}", index, MAX_INDEX)));
    }
    let leaf = ChildNumber::from_normal_idx(index).map_err(|e| WalletError::InvalidIndex(e.to_string()))?;
    let external = ChildNumber::from_normal_idx(EXTERNAL_CHAIN).map_err(|e| WalletError::InvalidIndex(e.to_string()))?;

    let mut path = account_path(network)?;
    path.push(external);
    path.push(leaf);

    let secp = Secp256k1::new();
    let child = master_key(seed)?
        .derive_priv(&secp, &DerivationPath::from(path))
        .map_err(|e| WalletError::InvalidIndex(format!("derivation: {}", e)))?;
    let secret_key = child.private_key;
    let public_key = secret_key.public_key(&secp);
    Ok(DerivedKeyPair { index, network, secret_key, public_key })
}

/// Shortcut for issuance: the address at `index`.
pub fn derive_address(seed: &WalletSeed, index: u32, network: Network) -> WalletResult<CashAddress> {
    Ok(derive_key_pair(seed, index, network)?.address())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn seed() -> WalletSeed {
        WalletSeed::parse(TEST_MNEMONIC).unwrap()
    }

    #[test]
    fn test_golden_mainnet_index_0() {
        let pair = derive_key_pair(&seed(), 0, Network::Mainnet).unwrap();
        assert_eq!(
            hex::encode(pair.secret_key.secret_bytes()),
            "28e9c4f61f735a059af93e0d9aca0b640126c827975841ad83723ccef295e659"
        );
        assert_eq!(
            pair.public_key.to_string(),
            "02bbe7dbcdf8b2261530a867df7180b17a90b482f74f2736b8a30d3f756e42e217"
        );
        assert_eq!(hex::encode(pair.pubkey_hash()), "086a977c7dad32a56996af2ce90a727238d48998");
        assert_eq!(pair.address().to_string(), "bitcoincash:qqyx49mu0kkn9ftfj6hje6g2wfer34yfnq5tahq3q6");
    }

    #[test]
    fn test_golden_testnet_index_0() {
        let addr = derive_address(&seed(), 0, Network::Testnet).unwrap();
        assert_eq!(addr.to_string(), "bchtest:qqaz6s295ncfs53m86qj0uw6sl8u2kuw0ymst35fx4");
    }

    #[test]
    fn test_account_key() {
        let account = derive_account_key(&seed()).unwrap();
        assert_eq!(
            account.public_key_hex(),
            "03f5d6ed4d10e9f9dfd26bd8799e4951e327d4a8d9a36e70fe71fe0cc5963545d5"
        );
        assert!(account.xpub.to_string().starts_with("xpub"));
        assert!(!format!("{:?}", account).contains("xprv"));
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let a = derive_key_pair(&seed(), 7, Network::Mainnet).unwrap();
        let b = derive_key_pair(&seed(), 7, Network::Mainnet).unwrap();
        let c = derive_key_pair(&seed(), 8, Network::Mainnet).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.public_key, c.public_key);
        assert_ne!(a.address(), c.address());
    }

    #[test]
    fn test_networks_use_different_coin_types() {
        let main = derive_key_pair(&seed(), 0, Network::Mainnet).unwrap();
        let test = derive_key_pair(&seed(), 0, Network::Testnet).unwrap();
        assert_ne!(main.public_key, test.public_key);
    }

    #[test]
    fn test_index_out_of_range() {
        assert!(derive_key_pair(&seed(), MAX_INDEX, Network::Mainnet).is_ok());
        assert!(matches!(
            derive_key_pair(&seed(), MAX_INDEX + 1, Network::Mainnet),
            Err(WalletError::InvalidIndex(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let pair = derive_key_pair(&seed(), 0, Network::Mainnet).unwrap();
        assert!(!format!("{:?}", pair).contains("28e9c4f6"));
    }
}
