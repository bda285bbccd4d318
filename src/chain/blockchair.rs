//! Blockchair HTTP adapter. Responses are decoded into a typed schema; absent
//! fields fall back to empty/zero rather than being indexed dynamically.

use super::{AddressActivity, AddressSummary, AddressTransaction, ChainData, Utxo};
use crate::cashaddr::CashAddress;
use crate::error::{ChainError, ChainResult};
use crate::network::Network;
use crate::paths::provider as paths;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Provider endpoints and transport limits.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub mainnet_url: String,
    pub testnet_url: String,
    pub timeout: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mainnet_url: Network::Mainnet.default_api_base().into(),
            testnet_url: Network::Testnet.default_api_base().into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ChainConfig {
    pub fn with_base_url(mut self, network: Network, url: impl Into<String>) -> Self {
        match network {
            Network::Mainnet => self.mainnet_url = url.into(),
            Network::Testnet => self.testnet_url = url.into(),
        }
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = timeout; self }

    pub fn base_url(&self, network: Network) -> &str {
        let url = match network {
            Network::Mainnet => &self.mainnet_url,
            Network::Testnet => &self.testnet_url,
        };
        url.trim_end_matches('/')
    }
}

// Wire schema

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    context: Option<Context>,
}

#[derive(Debug, Deserialize)]
struct Context {
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressDashboard {
    address: Option<AddressStats>,
    #[serde(default)]
    utxo: Vec<RawUtxo>,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressStats {
    #[serde(default)]
    balance: u64,
    #[serde(default)]
    received: u64,
    #[serde(default)]
    transaction_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawUtxo {
    transaction_hash: String,
    index: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    #[serde(default)]
    balance_change: i64,
    #[serde(default)]
    block_id: i64,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsData {
    best_block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PushData {
    transaction_hash: Option<String>,
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT).ok().map(|t| t.and_utc())
}

impl AddressStats {
    fn into_summary(self) -> AddressSummary {
        AddressSummary {
            balance_sats: self.balance,
            received_sats: self.received,
            transaction_count: self.transaction_count,
        }
    }
}

impl RawTransaction {
    fn into_transaction(self) -> AddressTransaction {
        AddressTransaction {
            block_height: u64::try_from(self.block_id).ok().filter(|h| *h > 0),
            time: self.time.as_deref().and_then(parse_time),
            hash: self.hash,
            balance_change: self.balance_change,
        }
    }
}

pub struct BlockchairClient {
    http: reqwest::Client,
    config: ChainConfig,
}

impl BlockchairClient {
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cashdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn dashboard(&self, address: &CashAddress) -> ChainResult<AddressDashboard> {
        let key = address.payload();
        let url = format!(
            "{}{}/{}?{}",
            self.config.base_url(address.network),
            paths::ADDRESS_DASHBOARD,
            key,
            paths::TRANSACTION_DETAILS_QUERY
        );
        debug!(%url, "fetching address dashboard");

        let res = self.http.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(ChainError::Status(res.status().as_u16()));
        }
        let envelope: Envelope<HashMap<String, AddressDashboard>> = res.json().await?;
        let mut entries = envelope.data.unwrap_or_default();

        let full = address.to_string();
        let entry = match entries.remove(&key).or_else(|| entries.remove(&full)) {
            Some(entry) => entry,
            None if entries.len() == 1 => entries.into_values().next().unwrap_or_default(),
            None => AddressDashboard::default(),
        };
        Ok(entry)
    }
}

#[async_trait]
impl ChainData for BlockchairClient {
    async fn fetch_utxos(&self, address: &CashAddress) -> ChainResult<Vec<Utxo>> {
        let dashboard = self.dashboard(address).await?;
        Ok(dashboard
            .utxo
            .into_iter()
            .map(|u| Utxo {
                txid: u.transaction_hash,
                output_index: u.index,
                value_sats: u.value,
                address: *address,
            })
            .collect())
    }

    async fn fetch_address_summary(&self, address: &CashAddress) -> ChainResult<AddressSummary> {
        Ok(self.dashboard(address).await?.address.unwrap_or_default().into_summary())
    }

    async fn fetch_address_transactions(&self, address: &CashAddress) -> ChainResult<Vec<AddressTransaction>> {
        let dashboard = self.dashboard(address).await?;
        Ok(dashboard.transactions.into_iter().map(RawTransaction::into_transaction).collect())
    }

    async fn fetch_address_activity(&self, address: &CashAddress) -> ChainResult<AddressActivity> {
        let dashboard = self.dashboard(address).await?;
        Ok(AddressActivity {
            summary: dashboard.address.unwrap_or_default().into_summary(),
            transactions: dashboard.transactions.into_iter().map(RawTransaction::into_transaction).collect(),
        })
    }

    async fn fetch_best_block_height(&self, network: Network) -> ChainResult<u64> {
        let url = format!("{}{}", self.config.base_url(network), paths::STATS);
        debug!(%url, "fetching chain stats");

        let res = self.http.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(ChainError::Status(res.status().as_u16()));
        }
        let envelope: Envelope<StatsData> = res.json().await?;
        envelope
            .data
            .and_then(|d| d.best_block_height)
            .ok_or_else(|| ChainError::Decode("missing best_block_height".into()))
    }

    async fn push_transaction(&self, raw_hex: &str, network: Network) -> ChainResult<Option<String>> {
        let url = format!("{}{}", self.config.base_url(network), paths::PUSH_TRANSACTION);
        debug!(%url, bytes = raw_hex.len() / 2, "pushing transaction");

        let res = self.http.post(&url).form(&[(paths::PUSH_FIELD, raw_hex)]).send().await?;
        let status = res.status();
        let body = res.text().await?;

        match serde_json::from_str::<Envelope<PushData>>(&body) {
            Ok(Envelope { context: Some(Context { error: Some(reason) }), .. }) => Err(ChainError::Rejected(reason)),
            Ok(envelope) if status.is_success() => Ok(envelope.data.and_then(|d| d.transaction_hash)),
            Ok(_) => Err(ChainError::Status(status.as_u16())),
            Err(e) if status.is_success() => {
                warn!(error = %e, "push accepted but response was not understood");
                Err(ChainError::Decode(e.to_string()))
            }
            Err(_) => Err(ChainError::Status(status.as_u16())),
        }
    }
}
