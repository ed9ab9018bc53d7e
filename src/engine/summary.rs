//! Summary aggregation: the incremental fold and the full recomputation.
//!
//! Central correctness property: for any completed-trade sequence, folding
//! trades one at a time must produce a summary identical to rebuilding from
//! scratch. `recompute` is therefore implemented as a replay of the same
//! fold, so the two cannot drift apart.

use crate::domain::{
    streaming_mean, CompletedTrade, Decimal, GasTrend, Summary, TimeS,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Folds completed trades into the rolling summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryAggregator;

impl SummaryAggregator {
    pub fn new() -> Self {
        SummaryAggregator
    }

    /// Incrementally fold one completed trade into the summary.
    ///
    /// Updates every counter except the protocol analytics, which are
    /// rebuilt by [`SummaryAggregator::rebuild_protocol`] from the full
    /// trade set.
    pub fn apply_trade(&self, summary: &mut Summary, trade: &CompletedTrade) {
        summary.totals.record(trade);

        for network in &trade.networks {
            summary
                .by_network
                .entry(network.as_str().to_string())
                .or_default()
                .record(trade);
        }

        self.apply_token(summary, trade);
        self.apply_time_buckets(summary, trade);
        self.apply_cross_network(summary, trade);

        summary.updated_ts = trade.completed_ts.as_secs();
    }

    /// Rebuild the summary from scratch over the full completed-trade set,
    /// in arrival order. Used after administrative removals and as a
    /// self-healing repair operation.
    pub fn recompute(&self, trades: &[CompletedTrade]) -> Summary {
        let mut summary = Summary::default();
        for trade in trades {
            self.apply_trade(&mut summary, trade);
        }
        self.rebuild_protocol(&mut summary, trades);
        summary
    }

    fn apply_token(&self, summary: &mut Summary, trade: &CompletedTrade) {
        let token = trade.entry_leg.token_pair.base().to_string();
        let stats = summary.by_token.entry(token).or_default();

        stats.trades += 1;
        if trade.category == crate::domain::TradeCategory::Profitable {
            stats.profitable += 1;
        }
        stats.net_profit_usdc = stats.net_profit_usdc + trade.net_profit_usdc;
        stats.gas_cost_usdc = stats.gas_cost_usdc + trade.gas_cost_usdc;
        stats.avg_trade_size_usdc =
            streaming_mean(stats.avg_trade_size_usdc, stats.trades, trade.entry_leg.amount_usdc);
        stats.win_rate = Decimal::from_u64(stats.profitable) / Decimal::from_u64(stats.trades);

        if stats.token_address.is_none() {
            stats.token_address = trade
                .entry_leg
                .meta
                .token_address
                .clone()
                .or_else(|| trade.exit_leg.meta.token_address.clone());
        }

        for network in &trade.networks {
            stats
                .by_network
                .entry(network.as_str().to_string())
                .or_default()
                .record(trade);
        }
    }

    fn apply_time_buckets(&self, summary: &mut Summary, trade: &CompletedTrade) {
        let (day, week, month) = time_buckets(trade.completed_ts);

        add_profit(&mut summary.profit_by_day, day.clone(), trade.net_profit_usdc);
        add_profit(&mut summary.profit_by_week, week, trade.net_profit_usdc);
        add_profit(&mut summary.profit_by_month, month, trade.net_profit_usdc);

        for network in &trade.networks {
            let key = format!("{}:{}", network.as_str(), day);
            add_profit(&mut summary.profit_by_network_day, key, trade.net_profit_usdc);
        }
    }

    fn apply_cross_network(&self, summary: &mut Summary, trade: &CompletedTrade) {
        let cross = &mut summary.cross_network;
        if trade.cross_network {
            cross.cross_network_trades += 1;
        }

        for network in &trade.networks {
            let key = network.as_str().to_string();
            let count = cross.trades_by_network.entry(key.clone()).or_insert(0);
            *count += 1;
            let n = *count;

            let gas = cross.avg_gas_by_network.entry(key.clone()).or_default();
            *gas = streaming_mean(*gas, n, trade.gas_cost_usdc);

            let eff = cross.avg_efficiency_by_network.entry(key).or_default();
            *eff = streaming_mean(*eff, n, trade.efficiency_score);
        }
    }

    /// Rebuild protocol analytics by scanning the full completed set.
    pub fn rebuild_protocol(&self, summary: &mut Summary, trades: &[CompletedTrade]) {
        use std::collections::BTreeSet;

        let mut tokens = BTreeSet::new();
        let mut router_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut pools = BTreeSet::new();
        let mut pair_counts: BTreeMap<String, u64> = BTreeMap::new();

        for trade in trades {
            tokens.insert(trade.entry_leg.token_pair.base().to_string());
            *pair_counts
                .entry(trade.entry_leg.token_pair.as_str().to_string())
                .or_insert(0) += 1;

            for leg in [&trade.entry_leg, &trade.exit_leg] {
                if let Some(router) = &leg.meta.router {
                    *router_counts.entry(router.clone()).or_insert(0) += 1;
                }
                if let Some(pool) = &leg.meta.pool {
                    pools.insert(pool.clone());
                }
            }
        }

        let protocol = &mut summary.protocol;
        protocol.unique_tokens = tokens.len() as u64;
        protocol.unique_routers = router_counts.len() as u64;
        protocol.unique_pools = pools.len() as u64;
        protocol.most_used_router = max_by_count(&router_counts);
        protocol.most_traded_pair = max_by_count(&pair_counts);
        protocol.gas_trend = gas_trend(trades);
    }
}

fn add_profit(map: &mut BTreeMap<String, Decimal>, key: String, net: Decimal) {
    let entry = map.entry(key).or_default();
    *entry = *entry + net;
}

/// Highest count wins; ties resolve to the lexicographically first key so
/// the result never depends on map iteration order.
fn max_by_count(counts: &BTreeMap<String, u64>) -> Option<String> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(key, _)| key.clone())
}

/// Day / ISO-week / month bucket labels for a timestamp.
fn time_buckets(ts: TimeS) -> (String, String, String) {
    let datetime = DateTime::<Utc>::from_timestamp(ts.as_secs(), 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is representable"));
    (
        datetime.format("%Y-%m-%d").to_string(),
        datetime.format("%G-W%V").to_string(),
        datetime.format("%Y-%m").to_string(),
    )
}

/// Average gas of the earliest three trades vs the most recent three.
/// Needs six trades before the two windows stop overlapping.
fn gas_trend(trades: &[CompletedTrade]) -> Option<GasTrend> {
    if trades.len() < 6 {
        return None;
    }

    let three = Decimal::from_u64(3);
    let earliest: Decimal = trades[..3].iter().map(|t| t.gas_cost_usdc).sum();
    let recent: Decimal = trades[trades.len() - 3..]
        .iter()
        .map(|t| t.gas_cost_usdc)
        .sum();
    let earliest_avg = earliest / three;
    let recent_avg = recent / three;

    Some(GasTrend {
        earliest_avg_gas_usdc: earliest_avg,
        recent_avg_gas_usdc: recent_avg,
        improving: recent_avg < earliest_avg,
    })
}
