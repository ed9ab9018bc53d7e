//! CompletedTrade: the immutable result of matching an entry leg with an
//! exit leg.

use crate::domain::{Decimal, NetworkKey, TimeS, TradeLeg};
use serde::{Deserialize, Serialize};

/// Classification of a completed trade's net outcome.
///
/// Uses an absolute ±0.01 USDC band so rounding noise around zero is
/// reported as breakeven instead of flapping between profit and loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeCategory {
    Profitable,
    Loss,
    Breakeven,
}

impl TradeCategory {
    /// Classify a net profit. The band edges belong to the outer classes:
    /// exactly 0.01 is profitable, exactly -0.01 is a loss.
    pub fn classify(net_profit_usdc: Decimal) -> Self {
        let band = Decimal::from_str_canonical("0.01").expect("valid decimal");
        if net_profit_usdc >= band {
            TradeCategory::Profitable
        } else if net_profit_usdc <= -band {
            TradeCategory::Loss
        } else {
            TradeCategory::Breakeven
        }
    }

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeCategory::Profitable => "profitable",
            TradeCategory::Loss => "loss",
            TradeCategory::Breakeven => "breakeven",
        }
    }
}

impl std::fmt::Display for TradeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A matched entry+exit pair with realized outcome. Immutable once created;
/// owns copies of both contributing legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTrade {
    /// Deterministic id: entry leg id, then exit leg id.
    pub trade_id: String,
    pub entry_leg: TradeLeg,
    pub exit_leg: TradeLeg,

    /// `exit.amount - entry.amount`.
    pub gross_profit_usdc: Decimal,
    /// Sum of both legs' quote-currency gas cost.
    pub gas_cost_usdc: Decimal,
    /// Sum of both legs' native-currency gas cost.
    pub gas_cost_native: Decimal,
    /// `gross - gas`.
    pub net_profit_usdc: Decimal,
    /// Net profit relative to the entry size, in percent; zero when the
    /// entry amount is zero.
    pub profit_pct: Decimal,

    /// Expected gross profit derived from the exit leg's router quote;
    /// zero when the trade shape carries no usable expectation.
    pub expected_gross_profit_usdc: Decimal,
    /// `gross - expected`.
    pub actual_vs_expected_usdc: Decimal,
    /// Variance relative to |expected|, in percent; zero when expected is
    /// exactly zero.
    pub actual_vs_expected_pct: Decimal,
    /// Exit-side execution shortfall against the router quote.
    pub slippage_usdc: Decimal,
    /// Realized gross as a percentage of expected gross; 100 when no
    /// expectation was available.
    pub execution_efficiency_pct: Decimal,

    /// Signal-to-signal duration between the chronologically first and
    /// second legs, in milliseconds. Never negative.
    pub signal_duration_ms: i64,
    /// Execution-to-execution duration, in milliseconds. Never negative.
    pub execution_duration_ms: i64,

    /// Mean of the two legs' captured native spot prices.
    pub avg_native_price_usdc: Decimal,
    /// Blended network cost-efficiency score in [0, 100].
    pub efficiency_score: Decimal,

    pub category: TradeCategory,
    /// Distinct networks touched by the two legs, sorted.
    pub networks: Vec<NetworkKey>,
    pub cross_network: bool,
    /// When the pairing was produced.
    pub completed_ts: TimeS,
}

impl CompletedTrade {
    /// Derive the canonical trade id from the two leg ids.
    pub fn derive_trade_id(entry_leg_id: &str, exit_leg_id: &str) -> String {
        format!("{}-{}", entry_leg_id, exit_leg_id)
    }

    /// The single network of a same-network trade, or None when cross-network.
    pub fn single_network(&self) -> Option<NetworkKey> {
        match self.networks.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}
