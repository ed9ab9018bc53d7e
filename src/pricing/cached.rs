//! Cached, never-failing price feed.
//!
//! Explicitly constructed and injected wherever a price is needed; the
//! refresh interval and static fallbacks are configuration, not globals.
//! Resolution order: fresh cache entry, then the underlying source, then a
//! stale cache entry, then the static fallback for the network.

use super::PriceSource;
use crate::domain::{Decimal, NetworkKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct CachedQuote {
    price: Decimal,
    fetched_at: Instant,
}

/// Price feed with an in-memory per-network cache and static fallbacks.
///
/// `price_for` never fails and never returns a non-positive value, so the
/// ingestion pass can resolve prices before entering its exclusive section
/// without a failure path.
#[derive(Debug)]
pub struct CachedPriceFeed {
    source: Arc<dyn PriceSource>,
    refresh: Duration,
    fallbacks: HashMap<NetworkKey, Decimal>,
    cache: RwLock<HashMap<NetworkKey, CachedQuote>>,
}

impl CachedPriceFeed {
    pub fn new(
        source: Arc<dyn PriceSource>,
        refresh: Duration,
        fallbacks: HashMap<NetworkKey, Decimal>,
    ) -> Self {
        Self {
            source,
            refresh,
            fallbacks,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Built-in conservative static prices, used when no override is
    /// configured for a network.
    pub fn default_fallbacks() -> HashMap<NetworkKey, Decimal> {
        let d = |s: &str| Decimal::from_str_canonical(s).expect("valid decimal");
        HashMap::from([
            (NetworkKey::Avalanche, d("25")),
            (NetworkKey::Arbitrum, d("2500")),
            (NetworkKey::Ethereum, d("2500")),
            (NetworkKey::Base, d("2500")),
            (NetworkKey::Optimism, d("2500")),
            (NetworkKey::Polygon, d("0.5")),
        ])
    }

    /// Current native price for a network, in USDC. Total: always positive.
    pub async fn price_for(&self, network: NetworkKey) -> Decimal {
        if let Some(quote) = self.fresh_quote(network).await {
            return quote;
        }

        match self.source.native_price_usdc(network).await {
            Ok(price) if price.is_positive() => {
                let mut cache = self.cache.write().await;
                cache.insert(
                    network,
                    CachedQuote {
                        price,
                        fetched_at: Instant::now(),
                    },
                );
                price
            }
            Ok(price) => {
                warn!(network = %network, price = %price, "Discarding non-positive quote");
                self.degraded_price(network).await
            }
            Err(e) => {
                warn!(network = %network, error = %e, "Price lookup failed, degrading");
                self.degraded_price(network).await
            }
        }
    }

    async fn fresh_quote(&self, network: NetworkKey) -> Option<Decimal> {
        let cache = self.cache.read().await;
        cache
            .get(&network)
            .filter(|quote| quote.fetched_at.elapsed() < self.refresh)
            .map(|quote| quote.price)
    }

    /// Stale cache entry if one exists, otherwise the static fallback.
    async fn degraded_price(&self, network: NetworkKey) -> Decimal {
        let cache = self.cache.read().await;
        if let Some(quote) = cache.get(&network) {
            return quote.price;
        }
        self.fallbacks
            .get(&network)
            .copied()
            .unwrap_or_else(|| {
                Self::default_fallbacks()
                    .get(&network)
                    .copied()
                    .expect("every network has a built-in fallback")
            })
    }

    /// The configured static fallback for a network, if any.
    pub fn fallback_for(&self, network: NetworkKey) -> Option<Decimal> {
        self.fallbacks.get(&network).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::MockPriceSource;
    use std::str::FromStr;

    fn feed(source: MockPriceSource, refresh: Duration) -> (CachedPriceFeed, MockPriceSource) {
        let handle = source.clone();
        let feed = CachedPriceFeed::new(
            Arc::new(source),
            refresh,
            CachedPriceFeed::default_fallbacks(),
        );
        (feed, handle)
    }

    #[test]
    fn test_cached_quote_within_refresh_window() {
        tokio_test::block_on(async {
            let source = MockPriceSource::new()
                .with_price(NetworkKey::Avalanche, Decimal::from_str("25").unwrap());
            let (feed, handle) = feed(source, Duration::from_secs(60));

            assert_eq!(
                feed.price_for(NetworkKey::Avalanche).await.to_canonical_string(),
                "25"
            );
            assert_eq!(
                feed.price_for(NetworkKey::Avalanche).await.to_canonical_string(),
                "25"
            );
            // Second lookup served from cache.
            assert_eq!(handle.call_count(), 1);
        });
    }

    #[tokio::test]
    async fn test_zero_refresh_always_refetches() {
        let source = MockPriceSource::new()
            .with_price(NetworkKey::Avalanche, Decimal::from_str("25").unwrap());
        let (feed, handle) = feed(source, Duration::from_secs(0));

        feed.price_for(NetworkKey::Avalanche).await;
        feed.price_for(NetworkKey::Avalanche).await;
        assert_eq!(handle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_static_price() {
        let (feed, _) = feed(MockPriceSource::failing(), Duration::from_secs(60));
        let price = feed.price_for(NetworkKey::Avalanche).await;
        assert_eq!(price.to_canonical_string(), "25");
        assert!(price.is_positive());
    }

    #[tokio::test]
    async fn test_failure_prefers_stale_cache_over_static() {
        let feed = CachedPriceFeed::new(
            Arc::new(MockPriceSource::failing()),
            Duration::from_secs(0),
            CachedPriceFeed::default_fallbacks(),
        );
        // Seed an expired entry; the lookup fails and must serve the stale
        // 30 rather than the static 25.
        feed.cache.write().await.insert(
            NetworkKey::Avalanche,
            CachedQuote {
                price: Decimal::from_str("30").unwrap(),
                fetched_at: Instant::now(),
            },
        );
        assert_eq!(
            feed.price_for(NetworkKey::Avalanche).await.to_canonical_string(),
            "30"
        );
    }

    #[tokio::test]
    async fn test_every_network_has_builtin_fallback() {
        let (feed, _) = feed(MockPriceSource::failing(), Duration::from_secs(60));
        for network in NetworkKey::ALL {
            assert!(feed.price_for(network).await.is_positive());
        }
    }
}
