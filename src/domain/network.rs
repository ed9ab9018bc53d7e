//! Canonical network identities and the label resolver.
//!
//! Upstream events carry free-form network labels ("avax", "Arbitrum One",
//! sometimes nothing at all). Every leg must land on a canonical network for
//! matching and gas normalization, so resolution is total: unknown or absent
//! labels fall back to the configured default.

use serde::{Deserialize, Serialize};

/// Canonical key for a supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKey {
    Avalanche,
    Arbitrum,
    Ethereum,
    Base,
    Optimism,
    Polygon,
}

impl NetworkKey {
    /// All supported networks, in stable order.
    pub const ALL: [NetworkKey; 6] = [
        NetworkKey::Avalanche,
        NetworkKey::Arbitrum,
        NetworkKey::Ethereum,
        NetworkKey::Base,
        NetworkKey::Optimism,
        NetworkKey::Polygon,
    ];

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKey::Avalanche => "avalanche",
            NetworkKey::Arbitrum => "arbitrum",
            NetworkKey::Ethereum => "ethereum",
            NetworkKey::Base => "base",
            NetworkKey::Optimism => "optimism",
            NetworkKey::Polygon => "polygon",
        }
    }

    /// Parse a stored canonical key. Only exact keys round-trip; free-form
    /// labels go through [`resolve_network`].
    pub fn from_canonical(key: &str) -> Option<Self> {
        match key {
            "avalanche" => Some(NetworkKey::Avalanche),
            "arbitrum" => Some(NetworkKey::Arbitrum),
            "ethereum" => Some(NetworkKey::Ethereum),
            "base" => Some(NetworkKey::Base),
            "optimism" => Some(NetworkKey::Optimism),
            "polygon" => Some(NetworkKey::Polygon),
            _ => None,
        }
    }

    /// The full descriptor for this network.
    pub fn descriptor(&self) -> NetworkDescriptor {
        match self {
            NetworkKey::Avalanche => NetworkDescriptor {
                key: *self,
                name: "Avalanche C-Chain",
                chain_id: 43114,
                native_currency: "AVAX",
                explorer_url: "https://snowtrace.io",
            },
            NetworkKey::Arbitrum => NetworkDescriptor {
                key: *self,
                name: "Arbitrum One",
                chain_id: 42161,
                native_currency: "ETH",
                explorer_url: "https://arbiscan.io",
            },
            NetworkKey::Ethereum => NetworkDescriptor {
                key: *self,
                name: "Ethereum Mainnet",
                chain_id: 1,
                native_currency: "ETH",
                explorer_url: "https://etherscan.io",
            },
            NetworkKey::Base => NetworkDescriptor {
                key: *self,
                name: "Base",
                chain_id: 8453,
                native_currency: "ETH",
                explorer_url: "https://basescan.org",
            },
            NetworkKey::Optimism => NetworkDescriptor {
                key: *self,
                name: "OP Mainnet",
                chain_id: 10,
                native_currency: "ETH",
                explorer_url: "https://optimistic.etherscan.io",
            },
            NetworkKey::Polygon => NetworkDescriptor {
                key: *self,
                name: "Polygon PoS",
                chain_id: 137,
                native_currency: "POL",
                explorer_url: "https://polygonscan.com",
            },
        }
    }
}

impl std::fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical network descriptor attached to every leg at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkDescriptor {
    pub key: NetworkKey,
    pub name: &'static str,
    pub chain_id: u64,
    pub native_currency: &'static str,
    pub explorer_url: &'static str,
}

/// Resolve a free-form network label to a canonical descriptor.
///
/// Total function: unrecognized or absent labels resolve to `default` so a
/// leg can never arrive without a network. Pure; no I/O.
pub fn resolve_network(label: Option<&str>, default: NetworkKey) -> NetworkDescriptor {
    let Some(label) = label else {
        return default.descriptor();
    };

    let normalized = label.trim().to_ascii_lowercase().replace([' ', '_'], "-");
    let key = match normalized.as_str() {
        "avalanche" | "avax" | "avax-c" | "avalanche-c-chain" | "c-chain" | "43114" => {
            Some(NetworkKey::Avalanche)
        }
        "arbitrum" | "arb" | "arbitrum-one" | "arb1" | "42161" => Some(NetworkKey::Arbitrum),
        "ethereum" | "eth" | "mainnet" | "1" => Some(NetworkKey::Ethereum),
        "base" | "8453" => Some(NetworkKey::Base),
        "optimism" | "op" | "op-mainnet" | "10" => Some(NetworkKey::Optimism),
        "polygon" | "matic" | "polygon-pos" | "137" => Some(NetworkKey::Polygon),
        "" => None,
        _ => None,
    };

    key.unwrap_or(default).descriptor()
}
