//! Read-only HTTP API (`server` feature)
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /health` | `{status, service, network}` |
//! | `GET /check-payment?address=&amount=` | payment verdict, `amount` in BCH |
//! | `GET /address/:index` | derived receive address (needs a configured wallet) |
//! | `GET /decode/:address` | CashAddr breakdown |

mod routes;

pub use routes::create_router;

use crate::chain::ChainData;
use crate::monitor::PaymentMonitor;
use crate::network::Network;
use crate::wallet::Wallet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub network: Network,
    pub monitor: Arc<PaymentMonitor>,
    pub wallet: Option<Arc<Wallet>>,
}

impl AppState {
    pub fn new(network: Network, chain: Arc<dyn ChainData>) -> Self {
        Self { network, monitor: Arc::new(PaymentMonitor::new(chain)), wallet: None }
    }
    pub fn with_wallet(mut self, wallet: Wallet) -> Self { self.wallet = Some(Arc::new(wallet)); self }
}
