//! Chain - block-data provider boundary
//!
//! The engine never syncs the chain itself; everything it knows about
//! balances, history and tip height comes through [`ChainData`].
//!
//! | Method | Provider call | Used by |
//! |--------|---------------|---------|
//! | `fetch_utxos` | `GET /dashboards/address/{addr}` | Sweeper |
//! | `fetch_address_summary` | `GET /dashboards/address/{addr}` | |
//! | `fetch_address_transactions` | `GET /dashboards/address/{addr}` | |
//! | `fetch_address_activity` | `GET /dashboards/address/{addr}` (once) | PaymentMonitor |
//! | `fetch_best_block_height` | `GET /stats` | PaymentMonitor |
//! | `push_transaction` | `POST /push/transaction` | Broadcaster |

mod blockchair;
mod memory;

pub use blockchair::{BlockchairClient, ChainConfig};
pub use memory::InMemoryChain;

use crate::cashaddr::CashAddress;
use crate::error::ChainResult;
use crate::network::Network;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A spendable output. Values are integer satoshis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub output_index: u32,
    pub value_sats: u64,
    pub address: CashAddress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub balance_sats: u64,
    pub received_sats: u64,
    pub transaction_count: u64,
}

/// One history entry as seen from the address. `block_height` is `None` while
/// the transaction sits in the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTransaction {
    pub hash: String,
    pub balance_change: i64,
    pub block_height: Option<u64>,
    pub time: Option<DateTime<Utc>>,
}

/// Summary and history read together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressActivity {
    pub summary: AddressSummary,
    /// Newest first.
    pub transactions: Vec<AddressTransaction>,
}

#[async_trait]
pub trait ChainData: Send + Sync {
    async fn fetch_utxos(&self, address: &CashAddress) -> ChainResult<Vec<Utxo>>;

    async fn fetch_address_summary(&self, address: &CashAddress) -> ChainResult<AddressSummary>;

    /// Newest first.
    async fn fetch_address_transactions(&self, address: &CashAddress) -> ChainResult<Vec<AddressTransaction>>;

    /// Providers that serve both from one response should override this.
    async fn fetch_address_activity(&self, address: &CashAddress) -> ChainResult<AddressActivity> {
        let summary = self.fetch_address_summary(address).await?;
        let transactions = self.fetch_address_transactions(address).await?;
        Ok(AddressActivity { summary, transactions })
    }

    async fn fetch_best_block_height(&self, network: Network) -> ChainResult<u64>;

    /// Returns the provider's transaction hash when it reports one.
    async fn push_transaction(&self, raw_hex: &str, network: Network) -> ChainResult<Option<String>>;
}
