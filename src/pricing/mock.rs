//! Mock price source for testing without network calls.

use super::{PriceSource, PriceSourceError};
use crate::domain::{Decimal, NetworkKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mock price source returning scripted per-network prices.
///
/// Tracks how many lookups were made so cache behavior is observable.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    prices: HashMap<NetworkKey, Decimal>,
    fail_all: bool,
    calls: Arc<AtomicU64>,
}

impl MockPriceSource {
    /// Create a mock with no quotes; every lookup is Unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a price for a network.
    pub fn with_price(mut self, network: NetworkKey, price: Decimal) -> Self {
        self.prices.insert(network, price);
        self
    }

    /// Make every lookup fail with a network error.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Number of lookups made against this source.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn native_price_usdc(&self, network: NetworkKey) -> Result<Decimal, PriceSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all {
            return Err(PriceSourceError::NetworkError("mock failure".to_string()));
        }

        self.prices
            .get(&network)
            .copied()
            .ok_or(PriceSourceError::Unsupported(network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_scripted_price_and_call_count() {
        let source = MockPriceSource::new()
            .with_price(NetworkKey::Avalanche, Decimal::from_str("25").unwrap());

        let price = source.native_price_usdc(NetworkKey::Avalanche).await.unwrap();
        assert_eq!(price.to_canonical_string(), "25");
        assert_eq!(source.call_count(), 1);

        let missing = source.native_price_usdc(NetworkKey::Polygon).await;
        assert!(matches!(missing, Err(PriceSourceError::Unsupported(_))));
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = MockPriceSource::failing();
        let result = source.native_price_usdc(NetworkKey::Ethereum).await;
        assert!(matches!(result, Err(PriceSourceError::NetworkError(_))));
    }
}
