//! Summary document operations.

use super::Repository;
use crate::domain::Summary;
use sqlx::Row;
use tracing::warn;

impl Repository {
    /// Load the current summary document, or the empty summary when none
    /// has been persisted yet.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_summary(&self) -> Result<Summary, sqlx::Error> {
        let row = sqlx::query("SELECT doc FROM summary_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(Summary::default());
        };

        let doc: String = row.get("doc");
        Ok(serde_json::from_str(&doc).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to parse stored summary document, using empty summary");
            Summary::default()
        }))
    }

    /// Replace the summary document outside any settle transaction, for the
    /// explicit recompute operation.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn store_summary(&self, summary: &Summary) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        upsert_summary_tx(&mut tx, summary).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Replace the single summary row inside an open transaction.
pub(super) async fn upsert_summary_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    summary: &Summary,
) -> Result<(), sqlx::Error> {
    let doc = serde_json::to_string(summary).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO summary_state (id, doc, updated_ts)
        VALUES (1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            doc = excluded.doc,
            updated_ts = excluded.updated_ts
        "#,
    )
    .bind(&doc)
    .bind(summary.updated_ts)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{NetworkKey, Summary};
    use crate::engine::SummaryAggregator;

    #[tokio::test]
    async fn test_missing_summary_is_empty() {
        let (repo, _temp) = setup_test_db().await;
        assert_eq!(repo.load_summary().await.unwrap(), Summary::default());
    }

    #[tokio::test]
    async fn test_store_and_load_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        let summary = SummaryAggregator::new().recompute(&[trade(NetworkKey::Avalanche, 1000)]);

        repo.store_summary(&summary).await.unwrap();
        assert_eq!(repo.load_summary().await.unwrap(), summary);

        // Second store replaces, not duplicates.
        let updated = SummaryAggregator::new().recompute(&[
            trade(NetworkKey::Avalanche, 1000),
            trade(NetworkKey::Arbitrum, 2000),
        ]);
        repo.store_summary(&updated).await.unwrap();
        assert_eq!(repo.load_summary().await.unwrap(), updated);
    }
}
