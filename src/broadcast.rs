//! Broadcast - hand a signed transaction to the provider.
//!
//! A rejection (the network said no) and an unreachable provider (nobody
//! answered usefully) are different errors so callers can decide whether a
//! retry makes sense.

use crate::chain::ChainData;
use crate::error::{ChainError, WalletError, WalletResult};
use crate::network::Network;
use bitcoin::hashes::{sha256d, Hash};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Broadcaster {
    chain: Arc<dyn ChainData>,
}

impl Broadcaster {
    pub fn new(chain: Arc<dyn ChainData>) -> Self {
        Self { chain }
    }

    pub async fn broadcast(&self, raw_hex: &str, network: Network) -> WalletResult<String> {
        match self.chain.push_transaction(raw_hex, network).await {
            Ok(Some(hash)) => {
                info!(txid = %hash, %network, "transaction broadcast");
                Ok(hash)
            }
            Ok(None) => {
                let txid = local_txid(raw_hex)?;
                info!(%txid, %network, "transaction broadcast, provider omitted hash");
                Ok(txid)
            }
            Err(ChainError::Rejected(reason)) => {
                warn!(%reason, %network, "broadcast rejected");
                Err(WalletError::BroadcastRejected(reason))
            }
            Err(e) => {
                warn!(error = %e, %network, "broadcast failed");
                Err(WalletError::BroadcastUnreachable(e.to_string()))
            }
        }
    }
}

/// Double SHA-256 of the raw bytes, displayed byte-reversed.
pub fn local_txid(raw_hex: &str) -> WalletResult<String> {
    let raw = hex::decode(raw_hex).map_err(|e| WalletError::Signing(format!("raw transaction hex: {}", e)))?;
    Ok(sha256d::Hash::hash(&raw).to_string())
}
