//! Active leg operations.

use super::{parse_decimal_or_default, Repository};
use crate::domain::{LegMeta, LegStatus, NetworkKey, TimeS, TokenPair, TradeAction, TradeLeg};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// Insert a leg into the active set idempotently.
    ///
    /// Returns false when a leg with the same event key already exists (in
    /// which case nothing is written).
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_leg(&self, leg: &TradeLeg) -> Result<bool, sqlx::Error> {
        let meta = serde_json::to_string(&leg.meta).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO active_legs
            (leg_id, event_key, token_pair, network, action, status,
             signal_ts, execution_ts, amount_usdc, gas_cost_usdc,
             gas_cost_native, native_price_usdc, meta, schema_version, ingested_ts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_key) DO NOTHING
            "#,
        )
        .bind(&leg.leg_id)
        .bind(&leg.event_key)
        .bind(leg.token_pair.as_str())
        .bind(leg.network.as_str())
        .bind(leg.action.as_str())
        .bind(leg.status.as_str())
        .bind(leg.signal_ts.as_secs())
        .bind(leg.execution_ts.as_secs())
        .bind(leg.amount_usdc.to_canonical_string())
        .bind(leg.gas_cost_usdc.to_canonical_string())
        .bind(leg.gas_cost_native.to_canonical_string())
        .bind(leg.native_price_usdc.to_canonical_string())
        .bind(&meta)
        .bind(leg.schema_version)
        .bind(leg.ingested_ts.as_secs())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Look up the leg id previously stored under an event key.
    ///
    /// Used to report the original leg id when a duplicate event arrives.
    pub async fn find_leg_id_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT leg_id FROM active_legs WHERE event_key = ?")
            .bind(event_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("leg_id")))
    }

    /// Look up the leg id an event key was settled under, if the key
    /// belongs to a leg already consumed into a completed trade.
    pub async fn find_consumed_leg_id_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT leg_id FROM consumed_event_keys WHERE event_key = ?")
            .bind(event_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("leg_id")))
    }

    /// Query the active set, most recent signal first, optionally filtered
    /// by network. Legacy rows are upgraded in memory on the way out.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_active_legs(
        &self,
        network: Option<NetworkKey>,
    ) -> Result<Vec<TradeLeg>, sqlx::Error> {
        let rows = match network {
            Some(network) => {
                sqlx::query(
                    r#"
                    SELECT * FROM active_legs
                    WHERE network = ?
                    ORDER BY signal_ts DESC, ingested_ts DESC, leg_id DESC
                    "#,
                )
                .bind(network.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM active_legs
                    ORDER BY signal_ts DESC, ingested_ts DESC, leg_id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(leg_from_row).collect())
    }
}

fn leg_from_row(row: &SqliteRow) -> TradeLeg {
    let leg_id: String = row.get("leg_id");
    let pair_raw: String = row.get("token_pair");
    let network_raw: String = row.get("network");
    let action_raw: String = row.get("action");
    let status_raw: String = row.get("status");
    let meta_raw: String = row.get("meta");

    let network = NetworkKey::from_canonical(&network_raw).unwrap_or_else(|| {
        warn!(leg_id = %leg_id, network = %network_raw, "Unknown stored network key, defaulting");
        NetworkKey::Avalanche
    });
    let action = TradeAction::parse(&action_raw).unwrap_or_else(|| {
        warn!(leg_id = %leg_id, action = %action_raw, "Unknown stored action, defaulting to sell");
        TradeAction::Sell
    });
    let meta: LegMeta = serde_json::from_str(&meta_raw).unwrap_or_else(|e| {
        warn!(leg_id = %leg_id, error = %e, "Failed to parse stored leg meta, using default");
        LegMeta::default()
    });

    let mut leg = TradeLeg {
        leg_id,
        event_key: row.get("event_key"),
        token_pair: TokenPair::from_canonical(pair_raw),
        network,
        action,
        status: LegStatus::parse(Some(&status_raw)),
        signal_ts: TimeS::new(row.get("signal_ts")),
        execution_ts: TimeS::new(row.get("execution_ts")),
        amount_usdc: parse_decimal_or_default("leg amount_usdc", &row.get::<String, _>("amount_usdc")),
        gas_cost_usdc: parse_decimal_or_default(
            "leg gas_cost_usdc",
            &row.get::<String, _>("gas_cost_usdc"),
        ),
        gas_cost_native: parse_decimal_or_default(
            "leg gas_cost_native",
            &row.get::<String, _>("gas_cost_native"),
        ),
        native_price_usdc: parse_decimal_or_default(
            "leg native_price_usdc",
            &row.get::<String, _>("native_price_usdc"),
        ),
        meta,
        schema_version: row.get("schema_version"),
        ingested_ts: TimeS::new(row.get("ingested_ts")),
    };
    leg.normalize_legacy();
    leg
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{Decimal, NetworkKey, TradeAction, LEG_SCHEMA_VERSION};
    use std::str::FromStr;

    #[tokio::test]
    async fn test_insert_and_query_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        let mut stored = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        stored.meta.router = Some("0xrouter".to_string());
        stored.meta.expected_out_usdc = Some(Decimal::from_str("105").unwrap());

        assert!(repo.insert_leg(&stored).await.unwrap());

        let legs = repo.query_active_legs(None).await.unwrap();
        assert_eq!(legs, vec![stored]);
    }

    #[tokio::test]
    async fn test_duplicate_event_key_ignored() {
        let (repo, _temp) = setup_test_db().await;
        let first = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        let mut second = leg(TradeAction::Buy, NetworkKey::Avalanche, 2000, "200");
        second.event_key = first.event_key.clone();

        assert!(repo.insert_leg(&first).await.unwrap());
        assert!(!repo.insert_leg(&second).await.unwrap());

        let legs = repo.query_active_legs(None).await.unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].leg_id, first.leg_id);

        let found = repo
            .find_leg_id_by_event_key(&first.event_key)
            .await
            .unwrap();
        assert_eq!(found, Some(first.leg_id));
    }

    #[tokio::test]
    async fn test_network_filter_and_ordering() {
        let (repo, _temp) = setup_test_db().await;
        let old = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        let new = leg(TradeAction::Sell, NetworkKey::Avalanche, 2000, "100");
        let other = leg(TradeAction::Buy, NetworkKey::Arbitrum, 1500, "100");
        for l in [&old, &new, &other] {
            repo.insert_leg(l).await.unwrap();
        }

        let avalanche = repo
            .query_active_legs(Some(NetworkKey::Avalanche))
            .await
            .unwrap();
        assert_eq!(avalanche.len(), 2);
        // Most recent signal first.
        assert_eq!(avalanche[0].leg_id, new.leg_id);
        assert_eq!(avalanche[1].leg_id, old.leg_id);

        let all = repo.query_active_legs(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_legacy_rows_upgraded_on_read() {
        let (repo, _temp) = setup_test_db().await;
        let mut stored = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        stored.schema_version = 1;
        stored.native_price_usdc = Decimal::zero();
        repo.insert_leg(&stored).await.unwrap();

        let legs = repo.query_active_legs(None).await.unwrap();
        assert_eq!(legs[0].schema_version, LEG_SCHEMA_VERSION);
        // Price re-derived from the stored gas figures: 0.05 / 0.002.
        assert_eq!(legs[0].native_price_usdc.to_canonical_string(), "25");
    }
}
