//! cashdrop: Bitcoin Cash payment-link wallet engine.
//!
//! One seed, one address per payment link, one transaction to collect them all.
//!
//! # Architecture
//!
//! ```text
//! WalletSeed (BIP39, sealed at rest)
//!   │
//!   ├── keys ──▶ m/44'/{coin}'/0'/0/{index} ──▶ cashaddr ──▶ "bitcoincash:q…"
//!   │              ▲
//!   │              └── IndexAllocator (owned by the app)
//!   │
//!   ├── PaymentMonitor ──▶ ChainData ──▶ paid? confirmations?
//!   │
//!   └── Sweeper ──▶ ChainData (UTXOs, concurrent)
//!                     └── tx::build_and_sign (forkid sighash) ──▶ Broadcaster
//!
//! ChainData: BlockchairClient (HTTP) | InMemoryChain (tests, demos)
//! ```
//!
//! # Operations
//!
//! | Operation | Entry point | Fails? |
//! |-----------|-------------|--------|
//! | issue address | `Wallet::issue_address` | index exhausted |
//! | check payment | `PaymentMonitor::poll` | never (unpaid on error) |
//! | sweep | `Sweeper::sweep` | no UTXOs, mismatch, broadcast |
//! | seal seed | `WalletSeed::seal` / `unseal` | wrong secret |
//!
//! # Features
//!
//! - `server` (default) - axum read API, used by `cashdrop serve`
//!
//! # Usage
//!
//! ```ignore
//! use cashdrop::{AtomicIndexAllocator, Network, Wallet, WalletSeed};
//!
//! let wallet = Wallet::new(WalletSeed::generate()?, Network::Mainnet);
//! let issued = wallet.issue_address(&AtomicIndexAllocator::starting_at(0))?;
//! println!("{}", issued.address);
//! ```

pub mod broadcast;
pub mod cashaddr;
pub mod chain;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod monitor;
pub mod network;
pub mod paths;
pub mod runtime;
pub mod seed;
pub mod sweep;
pub mod tx;
pub mod units;
pub mod wallet;

#[cfg(feature = "server")]
pub mod server;

pub use broadcast::Broadcaster;
pub use cashaddr::CashAddress;
pub use chain::{AddressActivity, AddressSummary, AddressTransaction, BlockchairClient, ChainConfig, ChainData, InMemoryChain, Utxo};
pub use config::EngineConfig;
pub use error::{ChainError, ChainResult, WalletError, WalletResult};
pub use keys::{AccountKey, AtomicIndexAllocator, DerivedKeyPair, IndexAllocator};
pub use monitor::{PaymentMonitor, PaymentStatus, PaymentVerdict};
pub use network::Network;
pub use runtime::{install_signal_handlers, Shutdown};
pub use seed::WalletSeed;
pub use sweep::{SweepConfig, SweepPreview, SweepReceipt, SweepSource, Sweeper};
pub use tx::{build_and_sign, SignedTransaction, SweepInput};
pub use wallet::{payment_uri, IssuedAddress, Wallet};

#[cfg(feature = "server")]
pub use server::{create_router, AppState};
