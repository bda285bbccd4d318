//! Engine configuration - built in code or read from `CASHDROP_*` variables.

use crate::chain::ChainConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::Network;
use crate::sweep::SweepConfig;
use crate::wallet::Wallet;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FEE_SATS: u64 = 1_000;
pub const DEFAULT_SWEEP_CONCURRENCY: usize = 4;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

pub mod vars {
    pub const NETWORK: &str = "CASHDROP_NETWORK";
    pub const FEE_SATS: &str = "CASHDROP_FEE_SATS";
    pub const API_MAINNET: &str = "CASHDROP_API_MAINNET";
    pub const API_TESTNET: &str = "CASHDROP_API_TESTNET";
    pub const HTTP_TIMEOUT_SECS: &str = "CASHDROP_HTTP_TIMEOUT_SECS";
    pub const SWEEP_CONCURRENCY: &str = "CASHDROP_SWEEP_CONCURRENCY";
    pub const POLL_SECS: &str = "CASHDROP_POLL_SECS";
    pub const SEALED_SEED: &str = "CASHDROP_SEALED_SEED";
    pub const SEED_SECRET: &str = "CASHDROP_SEED_SECRET";
}

#[derive(Clone)]
pub struct EngineConfig {
    pub network: Network,
    pub fee_sats: u64,
    pub chain: ChainConfig,
    pub sweep_concurrency: usize,
    pub poll_interval: Duration,
    pub sealed_seed: Option<String>,
    pub seed_secret: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            fee_sats: DEFAULT_FEE_SATS,
            chain: ChainConfig::default(),
            sweep_concurrency: DEFAULT_SWEEP_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sealed_seed: None,
            seed_secret: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("network", &self.network)
            .field("fee_sats", &self.fee_sats)
            .field("chain", &self.chain)
            .field("sweep_concurrency", &self.sweep_concurrency)
            .field("poll_interval", &self.poll_interval)
            .field("sealed_seed", &self.sealed_seed.is_some())
            .field("seed_secret", &self.seed_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EngineConfig {
    pub fn new(network: Network) -> Self {
        Self { network, ..Default::default() }
    }
    pub fn with_fee_sats(mut self, fee: u64) -> Self { self.fee_sats = fee; self }
    pub fn with_chain(mut self, chain: ChainConfig) -> Self { self.chain = chain; self }
    pub fn with_sweep_concurrency(mut self, n: usize) -> Self { self.sweep_concurrency = n.max(1); self }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval = interval; self }
    pub fn with_sealed_seed(mut self, sealed: impl Into<String>, secret: impl Into<String>) -> Self {
        self.sealed_seed = Some(sealed.into());
        self.seed_secret = Some(secret.into());
        self
    }

    /// Reads every `CASHDROP_*` variable; unset ones keep their defaults.
    pub fn from_env() -> WalletResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = env_string(vars::NETWORK) {
            config.network = Network::parse_alias(&raw)
                .ok_or_else(|| WalletError::Config(format!("{}: unknown network '{}'", vars::NETWORK, raw)))?;
        }
        if let Some(fee) = env_parse::<u64>(vars::FEE_SATS)? {
            config.fee_sats = fee;
        }
        if let Some(url) = env_string(vars::API_MAINNET) {
            config.chain = config.chain.with_base_url(Network::Mainnet, url);
        }
        if let Some(url) = env_string(vars::API_TESTNET) {
            config.chain = config.chain.with_base_url(Network::Testnet, url);
        }
        if let Some(secs) = env_parse::<u64>(vars::HTTP_TIMEOUT_SECS)? {
            config.chain = config.chain.with_timeout(Duration::from_secs(secs.max(1)));
        }
        if let Some(n) = env_parse::<usize>(vars::SWEEP_CONCURRENCY)? {
            config = config.with_sweep_concurrency(n);
        }
        if let Some(secs) = env_parse::<u64>(vars::POLL_SECS)? {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        config.sealed_seed = env_string(vars::SEALED_SEED);
        config.seed_secret = env_string(vars::SEED_SECRET);

        Ok(config)
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig { fee_sats: self.fee_sats, concurrency: self.sweep_concurrency }
    }

    /// Opens the configured sealed seed on the configured network.
    pub fn wallet(&self) -> WalletResult<Wallet> {
        let sealed = self
            .sealed_seed
            .as_deref()
            .ok_or_else(|| WalletError::Config(format!("{} not set", vars::SEALED_SEED)))?;
        let secret = self
            .seed_secret
            .as_deref()
            .ok_or_else(|| WalletError::Config(format!("{} not set", vars::SEED_SECRET)))?;
        Wallet::from_sealed(sealed, secret, self.network)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> WalletResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_string(key)
        .map(|raw| raw.parse::<T>().map_err(|e| WalletError::Config(format!("{}: {}", key, e))))
        .transpose()
}
