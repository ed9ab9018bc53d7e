//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `legs.rs` - Active leg operations
//! - `trades.rs` - Completed trade operations
//! - `summary.rs` - Summary document operations
//!
//! The settle transaction spans all three tables, so it lives here.

mod legs;
mod summary;
mod trades;

use crate::domain::{CompletedTrade, Decimal, Summary};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Cheap liveness probe against the underlying database.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Transaction coordination (spans multiple tables)
    // =========================================================================

    /// Settle one planned match atomically: delete both consumed legs,
    /// insert the completed trade, and replace the summary document.
    ///
    /// Rolls back (and errors) if either leg is no longer in the active set,
    /// so a leg can never be consumed twice even across concurrent passes.
    /// The UNIQUE constraints on `entry_leg_id` and `exit_leg_id` are the
    /// second line of that defense.
    ///
    /// # Errors
    /// Returns an error if any statement fails or a consumed leg is missing.
    pub async fn settle_match(
        &self,
        trade: &CompletedTrade,
        summary: &Summary,
    ) -> Result<(), sqlx::Error> {
        let doc = serde_json::to_string(trade).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let networks = serde_json::to_string(&trade.networks)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM active_legs WHERE leg_id IN (?, ?)")
            .bind(&trade.entry_leg.leg_id)
            .bind(&trade.exit_leg.leg_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() != 2 {
            warn!(
                trade_id = %trade.trade_id,
                deleted = deleted.rows_affected(),
                "Settle aborted: consumed leg no longer active"
            );
            return Err(sqlx::Error::RowNotFound);
        }

        // Retire both event keys so a producer retry of either leg is still
        // reported as a duplicate after settlement.
        for leg in [&trade.entry_leg, &trade.exit_leg] {
            sqlx::query(
                "INSERT INTO consumed_event_keys (event_key, leg_id, trade_id) VALUES (?, ?, ?)",
            )
            .bind(&leg.event_key)
            .bind(&leg.leg_id)
            .bind(&trade.trade_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO completed_trades
            (trade_id, entry_leg_id, exit_leg_id, token_pair, networks,
             cross_network, category, net_profit_usdc, completed_ts, doc)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trade.trade_id)
        .bind(&trade.entry_leg.leg_id)
        .bind(&trade.exit_leg.leg_id)
        .bind(trade.entry_leg.token_pair.as_str())
        .bind(&networks)
        .bind(trade.cross_network as i64)
        .bind(trade.category.as_str())
        .bind(trade.net_profit_usdc.to_canonical_string())
        .bind(trade.completed_ts.as_secs())
        .bind(&doc)
        .execute(&mut *tx)
        .await?;

        summary::upsert_summary_tx(&mut tx, summary).await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Parse a stored decimal column, warning and defaulting on corruption so a
/// single bad row cannot take a read path down.
pub(crate) fn parse_decimal_or_default(context: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            context = context,
            value = raw,
            error = %e,
            "Failed to parse stored decimal, using default"
        );
        Decimal::default()
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::domain::{NetworkKey, Summary, TradeAction};
    use crate::engine::SummaryAggregator;

    #[tokio::test]
    async fn test_settle_match_moves_legs_into_trade() {
        let (repo, _temp) = setup_test_db().await;

        let entry = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        let exit = leg(TradeAction::Sell, NetworkKey::Avalanche, 1060, "105");
        repo.insert_leg(&entry).await.unwrap();
        repo.insert_leg(&exit).await.unwrap();

        let trade = crate::engine::build_completed_trade(
            entry,
            exit,
            crate::domain::TimeS::new(2000),
        );
        let mut summary = Summary::default();
        SummaryAggregator::new().apply_trade(&mut summary, &trade);

        repo.settle_match(&trade, &summary).await.unwrap();

        assert!(repo.query_active_legs(None).await.unwrap().is_empty());
        let trades = repo.query_completed_trades(None).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0], trade);
        assert_eq!(repo.load_summary().await.unwrap(), summary);

        // Both event keys retired with the settle.
        for leg in [&trade.entry_leg, &trade.exit_leg] {
            let consumed = repo
                .find_consumed_leg_id_by_event_key(&leg.event_key)
                .await
                .unwrap();
            assert_eq!(consumed, Some(leg.leg_id.clone()));
        }
    }

    #[tokio::test]
    async fn test_settle_match_rolls_back_when_leg_missing() {
        let (repo, _temp) = setup_test_db().await;

        let entry = leg(TradeAction::Buy, NetworkKey::Avalanche, 1000, "100");
        let exit = leg(TradeAction::Sell, NetworkKey::Avalanche, 1060, "105");
        // Only the entry is active; the exit was never stored.
        repo.insert_leg(&entry).await.unwrap();

        let trade =
            crate::engine::build_completed_trade(entry, exit, crate::domain::TimeS::new(2000));
        let result = repo.settle_match(&trade, &Summary::default()).await;
        assert!(result.is_err());

        // Nothing moved: the entry is still active, no trade recorded.
        assert_eq!(repo.query_active_legs(None).await.unwrap().len(), 1);
        assert!(repo.query_completed_trades(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ping() {
        let (repo, _temp) = setup_test_db().await;
        repo.ping().await.unwrap();
    }
}
