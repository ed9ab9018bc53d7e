//! Domain primitives: TimeS, TokenPair, TradeAction, LegStatus.

use serde::{Deserialize, Serialize};

/// Time in whole seconds since Unix epoch.
///
/// Upstream signal producers report second-resolution timestamps; duration
/// math multiplies out to milliseconds at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeS(pub i64);

impl TimeS {
    /// Create a TimeS from seconds.
    pub fn new(secs: i64) -> Self {
        TimeS(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeS(chrono::Utc::now().timestamp())
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds elapsed since an earlier timestamp, clamped to zero.
    pub fn secs_since(&self, earlier: TimeS) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

/// A traded token pair in canonical `BASE-QUOTE` form, e.g. "WAVAX-USDC".
///
/// Producers report products as "WAVAX/USDC" or "wavax-usdc"; parsing
/// normalizes separator and case once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenPair(String);

impl TokenPair {
    /// Parse a product string into a canonical token pair.
    ///
    /// Returns None when the product does not contain exactly two non-empty
    /// symbols.
    pub fn parse(product: &str) -> Option<Self> {
        let parts: Vec<&str> = product
            .split(['/', '-'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 2 {
            return None;
        }
        Some(TokenPair(format!(
            "{}-{}",
            parts[0].to_ascii_uppercase(),
            parts[1].to_ascii_uppercase()
        )))
    }

    /// Rehydrate from an already-canonical stored value.
    pub fn from_canonical(pair: String) -> Self {
        TokenPair(pair)
    }

    /// Get the pair as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base (sold/bought token) symbol.
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or("")
    }

    /// The quote symbol.
    pub fn quote(&self) -> &str {
        self.0.split('-').nth(1).unwrap_or("")
    }

    /// True when the pair quotes in the stable quote currency.
    pub fn quotes_in_usdc(&self) -> bool {
        self.quote() == "USDC"
    }
}

impl std::fmt::Display for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The action that produced a leg.
///
/// `Buy` opens a round trip; the other three close one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
}

impl TradeAction {
    /// True when the action opens a round trip.
    pub fn is_entry(&self) -> bool {
        matches!(self, TradeAction::Buy)
    }

    /// Parse a producer-reported action label.
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "buy" => Some(TradeAction::Buy),
            "sell" => Some(TradeAction::Sell),
            "stop_loss" | "stoploss" => Some(TradeAction::StopLoss),
            "take_profit" | "takeprofit" => Some(TradeAction::TakeProfit),
            _ => None,
        }
    }

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::StopLoss => "stop_loss",
            TradeAction::TakeProfit => "take_profit",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution status reported for a leg.
///
/// Failed legs are stored for inspection but never matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Pending,
    Completed,
    Failed,
}

impl LegStatus {
    /// Parse a producer-reported status label; unknown labels are treated
    /// as pending so a mislabeled leg is still stored.
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(|s| s.to_ascii_lowercase()) {
            Some(ref s) if s == "completed" || s == "success" => LegStatus::Completed,
            Some(ref s) if s == "failed" || s == "error" => LegStatus::Failed,
            _ => LegStatus::Pending,
        }
    }

    /// Stable storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            LegStatus::Pending => "pending",
            LegStatus::Completed => "completed",
            LegStatus::Failed => "failed",
        }
    }

    /// Legs excluded from the matcher.
    pub fn is_matchable(&self) -> bool {
        !matches!(self, LegStatus::Failed)
    }
}

impl std::fmt::Display for LegStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_parse_variants() {
        for raw in ["WAVAX/USDC", "wavax-usdc", " WAVAX / usdc "] {
            let pair = TokenPair::parse(raw).expect("should parse");
            assert_eq!(pair.as_str(), "WAVAX-USDC");
        }
    }

    #[test]
    fn test_token_pair_parse_rejects_malformed() {
        assert!(TokenPair::parse("WAVAX").is_none());
        assert!(TokenPair::parse("A/B/C").is_none());
        assert!(TokenPair::parse("/USDC").is_none());
        assert!(TokenPair::parse("").is_none());
    }

    #[test]
    fn test_token_pair_components() {
        let pair = TokenPair::parse("WAVAX/USDC").unwrap();
        assert_eq!(pair.base(), "WAVAX");
        assert_eq!(pair.quote(), "USDC");
        assert!(pair.quotes_in_usdc());

        let other = TokenPair::parse("WETH/WAVAX").unwrap();
        assert!(!other.quotes_in_usdc());
    }

    #[test]
    fn test_trade_action_entry_roles() {
        assert!(TradeAction::Buy.is_entry());
        assert!(!TradeAction::Sell.is_entry());
        assert!(!TradeAction::StopLoss.is_entry());
        assert!(!TradeAction::TakeProfit.is_entry());
    }

    #[test]
    fn test_trade_action_parse_labels() {
        assert_eq!(TradeAction::parse("BUY"), Some(TradeAction::Buy));
        assert_eq!(TradeAction::parse("stop-loss"), Some(TradeAction::StopLoss));
        assert_eq!(TradeAction::parse("take profit"), Some(TradeAction::TakeProfit));
        assert_eq!(TradeAction::parse("hodl"), None);
    }

    #[test]
    fn test_leg_status_parse_defaults_to_pending() {
        assert_eq!(LegStatus::parse(Some("completed")), LegStatus::Completed);
        assert_eq!(LegStatus::parse(Some("FAILED")), LegStatus::Failed);
        assert_eq!(LegStatus::parse(Some("weird")), LegStatus::Pending);
        assert_eq!(LegStatus::parse(None), LegStatus::Pending);
    }

    #[test]
    fn test_failed_legs_not_matchable() {
        assert!(LegStatus::Pending.is_matchable());
        assert!(LegStatus::Completed.is_matchable());
        assert!(!LegStatus::Failed.is_matchable());
    }

    #[test]
    fn test_secs_since_clamped() {
        let early = TimeS::new(1000);
        let late = TimeS::new(1060);
        assert_eq!(late.secs_since(early), 60);
        assert_eq!(early.secs_since(late), 0);
    }
}
