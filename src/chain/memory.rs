//! In-process chain: fixtures per address, injectable failures, recorded pushes.
//! Deterministic, so monitor and sweep logic can be exercised without a network.

use super::{AddressSummary, AddressTransaction, ChainData, Utxo};
use crate::cashaddr::CashAddress;
use crate::error::{ChainError, ChainResult};
use crate::network::Network;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct AddressFixture {
    summary: AddressSummary,
    utxos: Vec<Utxo>,
    transactions: Vec<AddressTransaction>,
}

#[derive(Debug, Default)]
struct State {
    addresses: HashMap<CashAddress, AddressFixture>,
    failing: HashSet<CashAddress>,
    best_height: HashMap<Network, ChainResult<u64>>,
    push_result: Option<ChainResult<Option<String>>>,
    pushed: Vec<(String, Network)>,
}

#[derive(Debug, Default)]
pub struct InMemoryChain {
    state: Mutex<State>,
}

impl InMemoryChain {
    pub fn new() -> Self { Self::default() }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Adds a UTXO and keeps the address summary consistent with it.
    pub fn add_utxo(&self, address: &CashAddress, txid: impl Into<String>, output_index: u32, value_sats: u64) {
        self.with_state(|s| {
            let fixture = s.addresses.entry(*address).or_default();
            fixture.utxos.push(Utxo { txid: txid.into(), output_index, value_sats, address: *address });
            fixture.summary.balance_sats += value_sats;
            fixture.summary.received_sats += value_sats;
            fixture.summary.transaction_count += 1;
        })
    }

    pub fn set_summary(&self, address: &CashAddress, summary: AddressSummary) {
        self.with_state(|s| s.addresses.entry(*address).or_default().summary = summary)
    }

    /// Newest first, as the provider reports them.
    pub fn set_transactions(&self, address: &CashAddress, transactions: Vec<AddressTransaction>) {
        self.with_state(|s| s.addresses.entry(*address).or_default().transactions = transactions)
    }

    /// Every read for `address` fails with a transport error.
    pub fn fail_address(&self, address: &CashAddress) {
        self.with_state(|s| {
            s.failing.insert(*address);
        })
    }

    pub fn set_best_height(&self, network: Network, height: ChainResult<u64>) {
        self.with_state(|s| {
            s.best_height.insert(network, height);
        })
    }

    /// Outcome of the next pushes. Defaults to accepted without a hash.
    pub fn set_push_result(&self, result: ChainResult<Option<String>>) {
        self.with_state(|s| s.push_result = Some(result))
    }

    pub fn pushed(&self) -> Vec<(String, Network)> {
        self.with_state(|s| s.pushed.clone())
    }

    fn fixture(&self, address: &CashAddress) -> ChainResult<AddressFixture> {
        self.with_state(|s| {
            if s.failing.contains(address) {
                return Err(ChainError::Transport(format!("{} unreachable", address)));
            }
            Ok(s.addresses.get(address).cloned().unwrap_or_default())
        })
    }
}

#[async_trait]
impl ChainData for InMemoryChain {
    async fn fetch_utxos(&self, address: &CashAddress) -> ChainResult<Vec<Utxo>> {
        Ok(self.fixture(address)?.utxos)
    }

    async fn fetch_address_summary(&self, address: &CashAddress) -> ChainResult<AddressSummary> {
        Ok(self.fixture(address)?.summary)
    }

    async fn fetch_address_transactions(&self, address: &CashAddress) -> ChainResult<Vec<AddressTransaction>> {
        Ok(self.fixture(address)?.transactions)
    }

    async fn fetch_best_block_height(&self, network: Network) -> ChainResult<u64> {
        self.with_state(|s| s.best_height.get(&network).cloned().unwrap_or(Err(ChainError::Status(404))))
    }

    async fn push_transaction(&self, raw_hex: &str, network: Network) -> ChainResult<Option<String>> {
        self.with_state(|s| {
            let result = s.push_result.clone().unwrap_or(Ok(None));
            if result.is_ok() {
                s.pushed.push((raw_hex.to_string(), network));
            }
            result
        })
    }
}
