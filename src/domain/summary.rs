//! Rolling summary document: one per deployment.
//!
//! Every counter in here is derivable by folding the completed-trade set in
//! arrival order; `engine::summary` owns the fold and the full-recompute
//! pass and keeps the two in exact agreement.

use crate::domain::{CompletedTrade, Decimal, TradeCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counter block shared by the global, per-network, and nested per-token
/// breakdowns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub trades: u64,
    pub profitable: u64,
    pub losing: u64,
    pub breakeven: u64,
    pub gross_profit_usdc: Decimal,
    pub gas_cost_usdc: Decimal,
    pub net_profit_usdc: Decimal,
    /// `profitable / trades`; zero when empty.
    pub win_rate: Decimal,
    /// Streaming mean of net profit per trade.
    pub avg_net_profit_usdc: Decimal,
    /// Streaming mean of gas cost per trade.
    pub avg_gas_cost_usdc: Decimal,
}

impl BucketStats {
    /// Fold one completed trade into this block.
    pub fn record(&mut self, trade: &CompletedTrade) {
        self.trades += 1;
        match trade.category {
            TradeCategory::Profitable => self.profitable += 1,
            TradeCategory::Loss => self.losing += 1,
            TradeCategory::Breakeven => self.breakeven += 1,
        }
        self.gross_profit_usdc = self.gross_profit_usdc + trade.gross_profit_usdc;
        self.gas_cost_usdc = self.gas_cost_usdc + trade.gas_cost_usdc;
        self.net_profit_usdc = self.net_profit_usdc + trade.net_profit_usdc;

        let n = Decimal::from_u64(self.trades);
        self.win_rate = Decimal::from_u64(self.profitable) / n;
        self.avg_net_profit_usdc = streaming_mean(self.avg_net_profit_usdc, self.trades, trade.net_profit_usdc);
        self.avg_gas_cost_usdc = streaming_mean(self.avg_gas_cost_usdc, self.trades, trade.gas_cost_usdc);
    }
}

/// Streaming mean update: `(old_mean * (n - 1) + value) / n` where `n` is
/// the count including the new value.
pub fn streaming_mean(old_mean: Decimal, n: u64, value: Decimal) -> Decimal {
    let n_dec = Decimal::from_u64(n);
    (old_mean * (n_dec - Decimal::from_u64(1)) + value) / n_dec
}

/// Per-token performance, with a nested per-network breakdown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub trades: u64,
    pub profitable: u64,
    pub net_profit_usdc: Decimal,
    pub gas_cost_usdc: Decimal,
    /// Streaming mean of the entry-leg size.
    pub avg_trade_size_usdc: Decimal,
    pub win_rate: Decimal,
    /// Best-effort token address: first one seen wins.
    pub token_address: Option<String>,
    pub by_network: BTreeMap<String, BucketStats>,
}

/// Cross-network analytics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossNetworkStats {
    /// Trades whose legs touched more than one network.
    pub cross_network_trades: u64,
    /// Per-network trade-count distribution (a cross-network trade counts
    /// once for each network it touched).
    pub trades_by_network: BTreeMap<String, u64>,
    /// Streaming mean gas cost per network.
    pub avg_gas_by_network: BTreeMap<String, Decimal>,
    /// Streaming mean efficiency score per network.
    pub avg_efficiency_by_network: BTreeMap<String, Decimal>,
}

/// Gas-efficiency trend: earliest three trades vs most recent three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasTrend {
    pub earliest_avg_gas_usdc: Decimal,
    pub recent_avg_gas_usdc: Decimal,
    pub improving: bool,
}

/// Protocol analytics, rebuilt by scanning the full completed set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolStats {
    pub unique_tokens: u64,
    pub unique_routers: u64,
    pub unique_pools: u64,
    pub most_used_router: Option<String>,
    pub most_traded_pair: Option<String>,
    pub gas_trend: Option<GasTrend>,
}

/// The rolling aggregate over all completed trades.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub totals: BucketStats,
    pub by_network: BTreeMap<String, BucketStats>,
    pub by_token: BTreeMap<String, TokenStats>,
    /// Net profit keyed by "YYYY-MM-DD".
    pub profit_by_day: BTreeMap<String, Decimal>,
    /// Net profit keyed by ISO week, "GGGG-Www".
    pub profit_by_week: BTreeMap<String, Decimal>,
    /// Net profit keyed by "YYYY-MM".
    pub profit_by_month: BTreeMap<String, Decimal>,
    /// Net profit keyed by "network:YYYY-MM-DD".
    pub profit_by_network_day: BTreeMap<String, Decimal>,
    pub cross_network: CrossNetworkStats,
    pub protocol: ProtocolStats,
    /// Unix seconds of the last update; zero for a fresh summary.
    pub updated_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_streaming_mean_matches_arithmetic_mean() {
        let values = ["10", "20", "40", "-6"].map(|s| Decimal::from_str(s).unwrap());
        let mut mean = Decimal::zero();
        for (i, v) in values.iter().enumerate() {
            mean = streaming_mean(mean, (i + 1) as u64, *v);
        }
        assert_eq!(mean.to_canonical_string(), "16");
    }

    #[test]
    fn test_default_summary_is_zero_valued() {
        let summary = Summary::default();
        assert_eq!(summary.totals.trades, 0);
        assert!(summary.totals.net_profit_usdc.is_zero());
        assert!(summary.by_network.is_empty());
        assert!(summary.protocol.most_used_router.is_none());
        assert_eq!(summary.updated_ts, 0);
    }

    #[test]
    fn test_summary_serde_roundtrip() {
        let mut summary = Summary::default();
        summary
            .profit_by_day
            .insert("2026-08-25".to_string(), Decimal::from_str("4.95").unwrap());
        let json = serde_json::to_string(&summary).unwrap();
        let back: Summary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, back);
    }
}
