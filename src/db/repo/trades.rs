//! Completed trade operations.

use super::Repository;
use crate::domain::{CompletedTrade, NetworkKey};
use crate::engine::SummaryAggregator;
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// Query completed trades, most recent first, optionally filtered by
    /// network. Cross-network trades appear under every network they touch.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_completed_trades(
        &self,
        network: Option<NetworkKey>,
    ) -> Result<Vec<CompletedTrade>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT trade_id, doc FROM completed_trades
            ORDER BY completed_ts DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let trades = rows
            .iter()
            .filter_map(|row| trade_from_doc(&row.get::<String, _>("trade_id"), row.get("doc")))
            .filter(|trade| match network {
                Some(network) => trade.networks.contains(&network),
                None => true,
            })
            .collect();

        Ok(trades)
    }

    /// Load every completed trade in settlement order, for summary
    /// recomputation.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_all_completed(&self) -> Result<Vec<CompletedTrade>, sqlx::Error> {
        let rows = sqlx::query("SELECT trade_id, doc FROM completed_trades ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| trade_from_doc(&row.get::<String, _>("trade_id"), row.get("doc")))
            .collect())
    }

    /// Remove a completed trade and rebuild the summary from the remaining
    /// set, atomically. The consumed legs are not restored.
    ///
    /// Returns false when no trade with that id exists (nothing changes).
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn remove_completed_trade(&self, trade_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM completed_trades WHERE trade_id = ?")
            .bind(trade_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        // Free the removed trade's event keys so its legs can be replayed.
        sqlx::query("DELETE FROM consumed_event_keys WHERE trade_id = ?")
            .bind(trade_id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("SELECT trade_id, doc FROM completed_trades ORDER BY rowid ASC")
            .fetch_all(&mut *tx)
            .await?;
        let remaining: Vec<CompletedTrade> = rows
            .iter()
            .filter_map(|row| trade_from_doc(&row.get::<String, _>("trade_id"), row.get("doc")))
            .collect();

        let summary = SummaryAggregator::new().recompute(&remaining);
        super::summary::upsert_summary_tx(&mut tx, &summary).await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn trade_from_doc(trade_id: &str, doc: String) -> Option<CompletedTrade> {
    match serde_json::from_str(&doc) {
        Ok(trade) => Some(trade),
        Err(e) => {
            warn!(trade_id = %trade_id, error = %e, "Failed to parse stored trade document, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{NetworkKey, Summary};
    use crate::engine::SummaryAggregator;

    async fn settle(repo: &crate::db::Repository, t: &crate::domain::CompletedTrade) {
        repo.insert_leg(&t.entry_leg).await.unwrap();
        repo.insert_leg(&t.exit_leg).await.unwrap();
        let mut summary = repo.load_summary().await.unwrap();
        SummaryAggregator::new().apply_trade(&mut summary, t);
        repo.settle_match(t, &summary).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_ordering_and_network_filter() {
        let (repo, _temp) = setup_test_db().await;
        let first = trade(NetworkKey::Avalanche, 1000);
        let second = trade(NetworkKey::Arbitrum, 2000);
        settle(&repo, &first).await;
        settle(&repo, &second).await;

        let all = repo.query_completed_trades(None).await.unwrap();
        assert_eq!(all.len(), 2);
        // Most recent first.
        assert_eq!(all[0].trade_id, second.trade_id);

        let avalanche = repo
            .query_completed_trades(Some(NetworkKey::Avalanche))
            .await
            .unwrap();
        assert_eq!(avalanche.len(), 1);
        assert_eq!(avalanche[0].trade_id, first.trade_id);

        let settlement_order = repo.load_all_completed().await.unwrap();
        assert_eq!(settlement_order[0].trade_id, first.trade_id);
    }

    #[tokio::test]
    async fn test_remove_rebuilds_summary() {
        let (repo, _temp) = setup_test_db().await;
        let keep = trade(NetworkKey::Avalanche, 1000);
        let removed = trade(NetworkKey::Avalanche, 2000);
        settle(&repo, &keep).await;
        settle(&repo, &removed).await;

        assert!(repo.remove_completed_trade(&removed.trade_id).await.unwrap());

        let remaining = repo.query_completed_trades(None).await.unwrap();
        assert_eq!(remaining.len(), 1);

        let summary = repo.load_summary().await.unwrap();
        assert_eq!(summary.totals.trades, 1);

        // The removed trade's event keys are freed; the kept trade's stay.
        assert!(repo
            .find_consumed_leg_id_by_event_key(&removed.entry_leg.event_key)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_consumed_leg_id_by_event_key(&keep.entry_leg.event_key)
            .await
            .unwrap()
            .is_some());

        assert_eq!(summary, SummaryAggregator::new().recompute(&[keep]));
    }

    #[tokio::test]
    async fn test_remove_unknown_trade_is_noop() {
        let (repo, _temp) = setup_test_db().await;
        let t = trade(NetworkKey::Avalanche, 1000);
        settle(&repo, &t).await;
        let before = repo.load_summary().await.unwrap();

        assert!(!repo.remove_completed_trade("no-such-trade").await.unwrap());

        assert_eq!(repo.query_completed_trades(None).await.unwrap().len(), 1);
        assert_eq!(repo.load_summary().await.unwrap(), before);
        assert_ne!(before, Summary::default());
    }
}
