//! Sweep - consolidate many receive addresses into one payout
//!
//! ```text
//! sources ──verify (re-derive)──▶ JoinSet{ fetch_utxos } ≤ concurrency
//!                                         │ (joined, source order)
//!                                         ▼
//!                           keys per index ──▶ build_and_sign ──▶ broadcast
//! ```
//!
//! Fetch failures only shrink the sweep; they never abort it. Anything after
//! the fetch stage is fail-closed. A source listed twice is fetched once.

use crate::broadcast::Broadcaster;
use crate::cashaddr::CashAddress;
use crate::chain::{ChainData, Utxo};
use crate::error::{WalletError, WalletResult};
use crate::tx::{build_and_sign, SweepInput};
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub fee_sats: u64,
    pub concurrency: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { fee_sats: crate::config::DEFAULT_FEE_SATS, concurrency: crate::config::DEFAULT_SWEEP_CONCURRENCY }
    }
}

/// A receive address together with the index it was issued at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSource {
    pub index: u32,
    pub address: CashAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepPreview {
    pub source_count: usize,
    pub funded_sources: usize,
    pub skipped: Vec<CashAddress>,
    pub utxo_count: usize,
    pub total_sats: u64,
    pub fee_sats: u64,
    /// `total - fee`, or zero when the fee would eat everything.
    pub amount_sats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReceipt {
    pub txid: String,
    pub amount_sats: u64,
    pub fee_sats: u64,
    pub input_count: usize,
    pub source_count: usize,
    pub skipped: usize,
    pub explorer_url: String,
}

struct Collected {
    per_source: Vec<(SweepSource, Vec<Utxo>)>,
    skipped: Vec<CashAddress>,
}

impl Collected {
    fn utxo_count(&self) -> usize {
        self.per_source.iter().map(|(_, u)| u.len()).sum()
    }

    fn total_sats(&self) -> u64 {
        self.per_source.iter().flat_map(|(_, u)| u.iter()).fold(0u64, |acc, u| acc.saturating_add(u.value_sats))
    }
}

pub struct Sweeper {
    chain: Arc<dyn ChainData>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(chain: Arc<dyn ChainData>, config: SweepConfig) -> Self {
        Self { chain, config }
    }

    /// Dry run: what a sweep of `sources` would move right now.
    pub async fn preview(&self, sources: &[SweepSource]) -> WalletResult<SweepPreview> {
        if let Some(first) = sources.first() {
            for source in sources {
                source.address.require_network(first.address.network)?;
            }
        }
        let sources = distinct(sources);
        let collected = self.collect(&sources).await;
        let total = collected.total_sats();
        Ok(SweepPreview {
            source_count: sources.len(),
            funded_sources: collected.per_source.iter().filter(|(_, u)| !u.is_empty()).count(),
            utxo_count: collected.utxo_count(),
            total_sats: total,
            fee_sats: self.config.fee_sats,
            amount_sats: total.saturating_sub(self.config.fee_sats),
            skipped: collected.skipped,
        })
    }

    /// Moves every UTXO held by `sources` to `destination` in one transaction.
    pub async fn sweep(
        &self,
        wallet: &Wallet,
        sources: &[SweepSource],
        destination: &CashAddress,
    ) -> WalletResult<SweepReceipt> {
        let network = wallet.network();
        destination.require_network(network)?;
        for source in sources {
            wallet.verify_address(source.index, &source.address)?;
        }

        let sources = distinct(sources);
        let collected = self.collect(&sources).await;
        let mut inputs = Vec::with_capacity(collected.utxo_count());
        for (source, utxos) in &collected.per_source {
            if utxos.is_empty() {
                continue;
            }
            let key = wallet.key_pair(source.index)?;
            inputs.extend(utxos.iter().map(|utxo| SweepInput { utxo: utxo.clone(), key: key.clone() }));
        }
        if inputs.is_empty() {
            return Err(WalletError::NoUtxos);
        }

        let signed = build_and_sign(&inputs, destination, self.config.fee_sats, network)?;
        let txid = Broadcaster::new(self.chain.clone()).broadcast(&signed.raw_hex, network).await?;
        info!(%txid, amount = signed.amount_out_sats, inputs = signed.input_count, %destination, "sweep complete");

        Ok(SweepReceipt {
            explorer_url: network.explorer_tx_url(&txid),
            txid,
            amount_sats: signed.amount_out_sats,
            fee_sats: signed.fee_sats,
            input_count: signed.input_count,
            source_count: sources.len(),
            skipped: collected.skipped.len(),
        })
    }

    async fn collect(&self, sources: &[SweepSource]) -> Collected {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (slot, source) in sources.iter().enumerate() {
            let chain = self.chain.clone();
            let permits = permits.clone();
            let address = source.address;
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (slot, chain.fetch_utxos(&address).await)
            });
        }

        let mut results: Vec<Option<Vec<Utxo>>> = vec![None; sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Ok(utxos))) => results[slot] = Some(utxos),
                Ok((slot, Err(e))) => warn!(address = %sources[slot].address, error = %e, "utxo fetch failed, skipping"),
                Err(e) => warn!(error = %e, "utxo fetch task aborted"),
            }
        }

        let mut collected = Collected { per_source: Vec::with_capacity(sources.len()), skipped: Vec::new() };
        for (source, result) in sources.iter().zip(results) {
            match result {
                Some(utxos) => {
                    debug!(address = %source.address, count = utxos.len(), "utxos fetched");
                    collected.per_source.push((source.clone(), utxos));
                }
                None => collected.skipped.push(source.address),
            }
        }
        collected
    }
}

/// First occurrence of each address, in order.
fn distinct(sources: &[SweepSource]) -> Vec<SweepSource> {
    let mut seen = HashSet::with_capacity(sources.len());
    let unique: Vec<SweepSource> = sources.iter().filter(|s| seen.insert(s.address)).cloned().collect();
    if unique.len() < sources.len() {
        debug!(dropped = sources.len() - unique.len(), "duplicate sweep sources ignored");
    }
    unique
}
