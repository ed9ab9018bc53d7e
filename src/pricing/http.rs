//! HTTP price source against a Coingecko-compatible simple-price API.

use super::{PriceSource, PriceSourceError};
use crate::domain::{Decimal, NetworkKey};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Price source backed by `GET {base}/simple/price?ids=..&vs_currencies=usd`.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Create a new HTTP price source with a bounded request timeout.
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, base_url }
    }

    /// The quoted asset id for a network's native currency.
    fn asset_id(network: NetworkKey) -> &'static str {
        match network {
            NetworkKey::Avalanche => "avalanche-2",
            NetworkKey::Arbitrum
            | NetworkKey::Ethereum
            | NetworkKey::Base
            | NetworkKey::Optimism => "ethereum",
            NetworkKey::Polygon => "polygon-ecosystem-token",
        }
    }

    async fn fetch_quote(&self, asset_id: &str) -> Result<serde_json::Value, PriceSourceError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, asset_id
        );
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(PriceSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Retryable error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response.json::<serde_json::Value>().await.map_err(|e| {
                backoff::Error::permanent(PriceSourceError::ParseError(e.to_string()))
            })
        })
        .await
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn native_price_usdc(&self, network: NetworkKey) -> Result<Decimal, PriceSourceError> {
        let asset_id = Self::asset_id(network);
        debug!(network = %network, asset_id, "Fetching native price");

        let body = self.fetch_quote(asset_id).await?;
        let price = body
            .get(asset_id)
            .and_then(|entry| entry.get("usd"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| {
                PriceSourceError::ParseError(format!("missing usd quote for {}", asset_id))
            })?;

        // The simple-price API quotes floats; re-parse through the decimal
        // layer so downstream math stays canonical.
        let decimal = Decimal::from_str_canonical(&format!("{}", price))
            .map_err(|e| PriceSourceError::ParseError(e.to_string()))?;
        if !decimal.is_positive() {
            return Err(PriceSourceError::ParseError(format!(
                "non-positive quote {} for {}",
                decimal, asset_id
            )));
        }
        Ok(decimal)
    }
}
