//! Network selection. Every derivation, encoding and chain query takes one.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// BIP44 coin type: 145 for BCH, 1 for every test network.
    pub fn coin_type(&self) -> u32 {
        match self {
            Network::Mainnet => 145,
            Network::Testnet => 1,
        }
    }

    pub fn cashaddr_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "bitcoincash",
            Network::Testnet => "bchtest",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Network::ALL.into_iter().find(|n| n.cashaddr_prefix() == prefix)
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.blockchair.com/bitcoin-cash",
            Network::Testnet => "https://api.blockchair.com/bitcoin-cash/testnet",
        }
    }

    pub fn explorer_tx_url(&self, txid: &str) -> String {
        match self {
            Network::Mainnet => format!("https://blockchair.com/bitcoin-cash/transaction/{}", txid),
            Network::Testnet => format!("https://chipnet.imaginary.cash/tx/{}", txid),
        }
    }

    /// Accepts the canonical names plus common aliases, case-insensitively.
    pub fn parse_alias(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "production" | "bitcoincash" => Some(Network::Mainnet),
            "testnet" | "test" | "chipnet" | "bchtest" => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
