//! Monitor - has this address been paid?
//!
//! `poll` is a single, pure-from-the-caller's-view check. It never fails:
//! provider trouble reads as "not paid yet" and the caller simply polls again.
//!
//! ```text
//! activity ──(tx count 0)──▶ Unpaid
//!    │
//! history ──(no incoming)──▶ Unpaid
//!    │
//! newest incoming tx ──▶ paid = balance ≥ expected
//!    │
//! best height ──▶ confirmations
//! ```

use crate::cashaddr::CashAddress;
use crate::chain::{AddressActivity, ChainData};
use crate::error::ChainResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// Outcome of one poll. `amount_sats` is what the reference transaction paid
/// in; the address balance only decides `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerdict {
    pub paid: bool,
    pub amount_sats: u64,
    pub tx_hash: Option<String>,
    pub confirmations: u64,
}

impl PaymentVerdict {
    pub fn unpaid() -> Self {
        Self { paid: false, amount_sats: 0, tx_hash: None, confirmations: 0 }
    }

    pub fn status(&self) -> PaymentStatus {
        if self.paid { PaymentStatus::Paid } else { PaymentStatus::Unpaid }
    }
}

pub struct PaymentMonitor {
    chain: Arc<dyn ChainData>,
}

impl PaymentMonitor {
    pub fn new(chain: Arc<dyn ChainData>) -> Self {
        Self { chain }
    }

    /// Check `address` against an optional expected amount. `Some(0)` means
    /// any positive balance counts.
    pub async fn poll(&self, address: &CashAddress, expected_sats: Option<u64>) -> PaymentVerdict {
        match self.check(address, expected_sats).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(%address, error = %e, "payment check failed, reporting unpaid");
                PaymentVerdict::unpaid()
            }
        }
    }

    async fn check(&self, address: &CashAddress, expected_sats: Option<u64>) -> ChainResult<PaymentVerdict> {
        let AddressActivity { summary, transactions } = self.chain.fetch_address_activity(address).await?;
        if summary.transaction_count == 0 {
            debug!(%address, "no transactions yet");
            return Ok(PaymentVerdict::unpaid());
        }

        let Some(incoming) = transactions.into_iter().find(|tx| tx.balance_change > 0) else {
            debug!(%address, "no incoming transaction");
            return Ok(PaymentVerdict::unpaid());
        };

        let balance = summary.balance_sats;
        let paid = match expected_sats.filter(|e| *e > 0) {
            Some(expected) => balance >= expected,
            None => balance > 0,
        };

        let confirmations = match incoming.block_height {
            None => 0,
            Some(height) => match self.chain.fetch_best_block_height(address.network).await {
                Ok(best) => best.saturating_sub(height).saturating_add(1).max(1),
                Err(e) => {
                    warn!(%address, error = %e, "best height unavailable, assuming 1 confirmation");
                    1
                }
            },
        };

        let amount_sats = incoming.balance_change.unsigned_abs();
        debug!(%address, paid, balance, amount_sats, confirmations, tx = %incoming.hash, "payment checked");
        Ok(PaymentVerdict { paid, amount_sats, tx_hash: Some(incoming.hash), confirmations })
    }
}
