//! Native-currency price lookup abstraction.
//!
//! The engine only ever consumes prices through [`CachedPriceFeed`], which
//! wraps a [`PriceSource`] with a refresh interval and per-network static
//! fallbacks so a pass can never stall or fail on a price lookup.

use crate::domain::{Decimal, NetworkKey};
use async_trait::async_trait;
use std::fmt;

pub mod cached;
pub mod http;
pub mod mock;

pub use cached::CachedPriceFeed;
pub use http::HttpPriceSource;
pub use mock::MockPriceSource;

/// Source of native-currency spot prices in the quote currency.
///
/// Implementations must bound their own latency (request timeouts); callers
/// handle failures by falling back, never by aborting a pass.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Current spot price of the network's native currency in USDC.
    async fn native_price_usdc(&self, network: NetworkKey) -> Result<Decimal, PriceSourceError>;
}

/// Error type for price lookups.
#[derive(Debug, Clone)]
pub enum PriceSourceError {
    /// Network error (connection timeout, DNS failure).
    NetworkError(String),
    /// HTTP error (429 rate limit, 5xx server error).
    HttpError { status: u16, message: String },
    /// Invalid JSON or a malformed/missing price field.
    ParseError(String),
    /// The source does not quote this network.
    Unsupported(NetworkKey),
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PriceSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PriceSourceError::Unsupported(network) => {
                write!(f, "No quote for network: {}", network)
            }
        }
    }
}

impl std::error::Error for PriceSourceError {}
