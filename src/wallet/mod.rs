//! Wallet - one seed bound to one network
//!
//! ```text
//! Wallet { seed, network }
//!     │
//!     ├── issue_address(allocator) ──▶ reserve index ──▶ derive ──▶ IssuedAddress
//!     ├── address_at / key_pair    ──▶ m/44'/{coin}'/0'/0/{index}
//!     ├── verify_address           ──▶ re-derive and compare
//!     └── account_key              ──▶ m/44'/145'/0' (display only)
//! ```
//!
//! The index counter belongs to whoever persists payment links; the wallet only
//! asks it for the next value.

use crate::cashaddr::CashAddress;
use crate::error::{WalletError, WalletResult};
use crate::keys::{self, AccountKey, DerivedKeyPair, IndexAllocator};
use crate::network::Network;
use crate::seed::WalletSeed;
use crate::units::format_bch;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAddress {
    pub index: u32,
    pub address: CashAddress,
}

#[derive(Debug, Clone)]
pub struct Wallet {
    seed: WalletSeed,
    network: Network,
}

impl Wallet {
    pub fn new(seed: WalletSeed, network: Network) -> Self {
        Self { seed, network }
    }

    /// Opens a wallet from its sealed mnemonic.
    pub fn from_sealed(sealed: &str, secret: &str, network: Network) -> WalletResult<Self> {
        Ok(Self::new(WalletSeed::unseal(sealed, secret)?, network))
    }

    pub fn network(&self) -> Network { self.network }
    pub fn seed(&self) -> &WalletSeed { &self.seed }

    pub fn address_at(&self, index: u32) -> WalletResult<CashAddress> {
        keys::derive_address(&self.seed, index, self.network)
    }

    pub fn key_pair(&self, index: u32) -> WalletResult<DerivedKeyPair> {
        keys::derive_key_pair(&self.seed, index, self.network)
    }

    pub fn account_key(&self) -> WalletResult<AccountKey> {
        keys::derive_account_key(&self.seed)
    }

    /// Reserves the next index and derives its address.
    pub fn issue_address(&self, allocator: &dyn IndexAllocator) -> WalletResult<IssuedAddress> {
        let index = allocator.reserve_next_index()?;
        let address = self.address_at(index)?;
        info!(index, %address, "issued receive address");
        Ok(IssuedAddress { index, address })
    }

    /// Checks that `address` is what this seed derives at `index`.
    pub fn verify_address(&self, index: u32, address: &CashAddress) -> WalletResult<()> {
        address.require_network(self.network)?;
        let derived = self.address_at(index)?;
        if &derived != address {
            debug!(index, expected = %derived, actual = %address, "address does not match seed");
            return Err(WalletError::AddressMismatch { index, address: address.to_string() });
        }
        Ok(())
    }
}

/// `bitcoincash:<payload>[?amount=<bch>]` for QR codes and wallet links.
pub fn payment_uri(address: &CashAddress, amount_sats: Option<u64>) -> String {
    match amount_sats.filter(|a| *a > 0) {
        Some(sats) => format!("{}?amount={}", address, format_bch(sats)),
        None => address.to_string(),
    }
}
