//! The serialized ingestion pass.
//!
//! One leg event comes in, one pass runs: validate, price, store, match,
//! settle. Passes are serialized behind an async mutex so matching always
//! sees a consistent active set; price resolution happens before the lock
//! is taken because it may touch the network.

use crate::db::Repository;
use crate::domain::{
    resolve_network, EventValidationError, LegMeta, NetworkKey, RawLegEvent, Summary, TimeS,
    TradeLeg,
};
use crate::engine::{build_completed_trade, normalize_gas, MatchPlanner, SummaryAggregator};
use crate::orchestration::hook::TradeHook;
use crate::pricing::CachedPriceFeed;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    InvalidEvent(#[from] EventValidationError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Result of one ingestion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Id of the stored leg; for a duplicate event, the id stored the first
    /// time.
    pub leg_id: String,
    /// True when the event key was already known and nothing was written.
    pub duplicate: bool,
    /// Trades settled by the matching pass this event triggered.
    pub completed_trade_ids: Vec<String>,
}

/// Runs ingestion passes against one repository.
pub struct Ingestor {
    repo: Arc<Repository>,
    feed: Arc<CachedPriceFeed>,
    planner: MatchPlanner,
    aggregator: SummaryAggregator,
    default_network: NetworkKey,
    hook: Arc<dyn TradeHook>,
    pass_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        repo: Arc<Repository>,
        feed: Arc<CachedPriceFeed>,
        planner: MatchPlanner,
        default_network: NetworkKey,
        hook: Arc<dyn TradeHook>,
    ) -> Self {
        Self {
            repo,
            feed,
            planner,
            aggregator: SummaryAggregator::new(),
            default_network,
            hook,
            pass_lock: Mutex::new(()),
        }
    }

    /// Ingest one leg event and run a matching pass.
    ///
    /// Duplicate events (same idempotency key) return the originally stored
    /// leg id and skip the pass entirely.
    ///
    /// # Errors
    /// Returns an error for structurally invalid events or storage failures.
    pub async fn ingest_leg(&self, event: RawLegEvent) -> Result<IngestOutcome, IngestError> {
        let validated = event.validate()?;

        let network = resolve_network(event.network.as_deref(), self.default_network).key;
        // Network I/O stays outside the pass lock; the feed degrades to a
        // cached or static price rather than failing.
        let native_price = self.feed.price_for(network).await;
        let gas = normalize_gas(network, event.gas_used, event.gas_price_wei, native_price);

        let event_key = TradeLeg::compute_event_key(
            event.event_id.as_deref(),
            &validated.token_pair,
            network,
            validated.action,
            validated.signal_ts,
            &event.amount_usdc,
        );
        let leg = TradeLeg::create(
            event_key,
            validated.token_pair,
            network,
            validated.action,
            validated.status,
            validated.signal_ts,
            validated.execution_ts,
            event.amount_usdc,
            gas.usdc,
            gas.native,
            gas.native_price_usdc,
            LegMeta {
                expected_out_usdc: event.expected_out_usdc,
                token_address: event.token_address,
                router: event.router,
                pool: event.pool,
                tx_hash: event.tx_hash,
            },
        );

        let _pass = self.pass_lock.lock().await;

        // A retry of a leg that was already settled into a trade must not
        // re-enter the active set.
        if let Some(consumed) = self
            .repo
            .find_consumed_leg_id_by_event_key(&leg.event_key)
            .await?
        {
            info!(event_key = %leg.event_key, leg_id = %consumed, "Duplicate of settled leg ignored");
            return Ok(IngestOutcome {
                leg_id: consumed,
                duplicate: true,
                completed_trade_ids: Vec::new(),
            });
        }

        if !self.repo.insert_leg(&leg).await? {
            let existing = self
                .repo
                .find_leg_id_by_event_key(&leg.event_key)
                .await?
                .unwrap_or_else(|| {
                    warn!(event_key = %leg.event_key, "Duplicate event key not in active set");
                    leg.leg_id.clone()
                });
            info!(event_key = %leg.event_key, leg_id = %existing, "Duplicate leg event ignored");
            return Ok(IngestOutcome {
                leg_id: existing,
                duplicate: true,
                completed_trade_ids: Vec::new(),
            });
        }

        let completed_trade_ids = self.run_matching_pass().await?;
        Ok(IngestOutcome {
            leg_id: leg.leg_id,
            duplicate: false,
            completed_trade_ids,
        })
    }

    /// Plan and settle matches over the current active set. Caller must hold
    /// the pass lock.
    async fn run_matching_pass(&self) -> Result<Vec<String>, IngestError> {
        let active = self.repo.query_active_legs(None).await?;
        let planned = self.planner.plan(&active);
        if planned.is_empty() {
            return Ok(Vec::new());
        }

        let mut summary = self.repo.load_summary().await?;
        let mut all_trades = self.repo.load_all_completed().await?;
        let mut settled = Vec::with_capacity(planned.len());

        for pair in planned {
            let trade = build_completed_trade(pair.entry, pair.exit, TimeS::now());
            self.aggregator.apply_trade(&mut summary, &trade);
            all_trades.push(trade.clone());
            self.aggregator.rebuild_protocol(&mut summary, &all_trades);

            self.repo.settle_match(&trade, &summary).await?;
            info!(
                trade_id = %trade.trade_id,
                category = %trade.category,
                net_profit = %trade.net_profit_usdc,
                "Trade settled"
            );
            self.hook.on_trade_completed(&trade).await;
            settled.push(trade.trade_id.clone());
        }

        Ok(settled)
    }

    /// Remove a completed trade and rebuild the summary. Returns false when
    /// the trade does not exist.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn remove_trade(&self, trade_id: &str) -> Result<bool, IngestError> {
        let _pass = self.pass_lock.lock().await;
        let removed = self.repo.remove_completed_trade(trade_id).await?;
        if removed {
            info!(trade_id = %trade_id, "Completed trade removed, summary rebuilt");
        }
        Ok(removed)
    }

    /// Rebuild the summary from the full completed-trade set and persist it.
    ///
    /// # Errors
    /// Returns an error if storage fails.
    pub async fn recompute_summary(&self) -> Result<Summary, IngestError> {
        let _pass = self.pass_lock.lock().await;
        let trades = self.repo.load_all_completed().await?;
        let summary = self.aggregator.recompute(&trades);
        self.repo.store_summary(&summary).await?;
        info!(trades = trades.len(), "Summary recomputed from scratch");
        Ok(summary)
    }
}
