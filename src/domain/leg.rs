//! TradeLeg: one side of a round-trip trade.

use crate::domain::{Decimal, LegStatus, NetworkKey, TimeS, TokenPair, TradeAction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current leg schema version. Rows persisted by older builds are upgraded
/// once on read by [`TradeLeg::normalize_legacy`].
pub const LEG_SCHEMA_VERSION: i32 = 2;

/// Optional execution metadata carried by a leg.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegMeta {
    /// Expected quote-currency output reported by the router quote, if any.
    pub expected_out_usdc: Option<Decimal>,
    /// Best-effort address of the non-quote token.
    pub token_address: Option<String>,
    /// Router contract that executed the swap.
    pub router: Option<String>,
    /// Pool the swap routed through.
    pub pool: Option<String>,
    /// On-chain transaction hash.
    pub tx_hash: Option<String>,
}

/// One side of a round-trip trade.
///
/// Created exactly once at ingestion and never mutated afterwards, apart
/// from the legacy normalization pass applied when old rows are read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLeg {
    /// Unique id generated at ingestion.
    pub leg_id: String,
    /// Idempotency key: producer event id when present, content hash otherwise.
    pub event_key: String,
    /// Canonical token pair, e.g. "WAVAX-USDC".
    pub token_pair: TokenPair,
    /// Canonical network the leg executed on.
    pub network: NetworkKey,
    /// Producing action; `buy` opens a round trip.
    pub action: TradeAction,
    /// Execution status; failed legs are stored but never matched.
    pub status: LegStatus,
    /// When the originating signal was received (unix seconds).
    pub signal_ts: TimeS,
    /// When the blockchain operation confirmed. Always > `signal_ts`: equal
    /// producer timestamps are nudged forward one second at construction.
    pub execution_ts: TimeS,
    /// Normalized quote-currency size of the leg.
    pub amount_usdc: Decimal,
    /// Gas cost in the quote currency, captured at ingestion.
    pub gas_cost_usdc: Decimal,
    /// Gas cost in the network's native currency.
    pub gas_cost_native: Decimal,
    /// Native spot price used for the conversion, captured at ingestion so
    /// completed-trade math stays reproducible.
    pub native_price_usdc: Decimal,
    /// Optional execution metadata.
    #[serde(default)]
    pub meta: LegMeta,
    /// Leg schema version this record was written with.
    pub schema_version: i32,
    /// When this leg was ingested.
    pub ingested_ts: TimeS,
}

impl TradeLeg {
    /// Create a new leg at ingestion time.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        event_key: String,
        token_pair: TokenPair,
        network: NetworkKey,
        action: TradeAction,
        status: LegStatus,
        signal_ts: TimeS,
        execution_ts: TimeS,
        amount_usdc: Decimal,
        gas_cost_usdc: Decimal,
        gas_cost_native: Decimal,
        native_price_usdc: Decimal,
        meta: LegMeta,
    ) -> Self {
        // Duration math downstream requires execution strictly after signal.
        let execution_ts = if execution_ts.as_secs() <= signal_ts.as_secs() {
            TimeS::new(signal_ts.as_secs() + 1)
        } else {
            execution_ts
        };

        TradeLeg {
            leg_id: Uuid::new_v4().to_string(),
            event_key,
            token_pair,
            network,
            action,
            status,
            signal_ts,
            execution_ts,
            amount_usdc,
            gas_cost_usdc,
            gas_cost_native,
            native_price_usdc,
            meta,
            schema_version: LEG_SCHEMA_VERSION,
            ingested_ts: TimeS::now(),
        }
    }

    /// True when this leg opens a round trip.
    pub fn is_entry(&self) -> bool {
        self.action.is_entry()
    }

    /// Seconds between signal receipt and on-chain confirmation.
    pub fn execution_delay_secs(&self) -> i64 {
        self.execution_ts.secs_since(self.signal_ts)
    }

    /// Derive the idempotency key for a leg event.
    ///
    /// Priority: producer event id (if present) > hash of deterministic fields.
    pub fn compute_event_key(
        producer_event_id: Option<&str>,
        token_pair: &TokenPair,
        network: NetworkKey,
        action: TradeAction,
        signal_ts: TimeS,
        amount_usdc: &Decimal,
    ) -> String {
        if let Some(id) = producer_event_id {
            let trimmed = id.trim();
            if !trimmed.is_empty() {
                return format!("evt:{}", trimmed);
            }
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(token_pair.as_str());
        hasher.update(network.as_str());
        hasher.update(action.as_str());
        hasher.update(signal_ts.as_secs().to_le_bytes());
        hasher.update(amount_usdc.to_canonical_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    /// Upgrade a record written by an older schema version.
    ///
    /// Version 1 rows could persist a zero native price while still carrying
    /// both gas figures; the price is re-derived from their ratio. The
    /// timestamp nudge is reapplied for rows written before it existed.
    pub fn normalize_legacy(&mut self) {
        if self.schema_version >= LEG_SCHEMA_VERSION {
            return;
        }

        if self.native_price_usdc.is_zero() && self.gas_cost_native.is_positive() {
            self.native_price_usdc = self.gas_cost_usdc / self.gas_cost_native;
        }
        if self.execution_ts.as_secs() <= self.signal_ts.as_secs() {
            self.execution_ts = TimeS::new(self.signal_ts.as_secs() + 1);
        }
        self.schema_version = LEG_SCHEMA_VERSION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn pair() -> TokenPair {
        TokenPair::parse("WAVAX/USDC").unwrap()
    }

    fn make_leg(signal: i64, execution: i64) -> TradeLeg {
        TradeLeg::create(
            "evt:1".to_string(),
            pair(),
            NetworkKey::Avalanche,
            TradeAction::Buy,
            LegStatus::Completed,
            TimeS::new(signal),
            TimeS::new(execution),
            Decimal::from_str("100").unwrap(),
            Decimal::from_str("0.05").unwrap(),
            Decimal::from_str("0.002").unwrap(),
            Decimal::from_str("25").unwrap(),
            LegMeta::default(),
        )
    }

    #[test]
    fn test_equal_timestamps_nudged_forward() {
        let leg = make_leg(1000, 1000);
        assert_eq!(leg.execution_ts.as_secs(), 1001);
        assert_eq!(leg.execution_delay_secs(), 1);
    }

    #[test]
    fn test_reversed_timestamps_nudged_forward() {
        let leg = make_leg(1000, 900);
        assert_eq!(leg.execution_ts.as_secs(), 1001);
    }

    #[test]
    fn test_distinct_leg_ids() {
        let a = make_leg(1000, 1060);
        let b = make_leg(1000, 1060);
        assert_ne!(a.leg_id, b.leg_id);
    }

    #[test]
    fn test_event_key_prefers_producer_id() {
        let key = TradeLeg::compute_event_key(
            Some("  abc-123 "),
            &pair(),
            NetworkKey::Avalanche,
            TradeAction::Buy,
            TimeS::new(1000),
            &Decimal::from_str("100").unwrap(),
        );
        assert_eq!(key, "evt:abc-123");
    }

    #[test]
    fn test_event_key_hash_fallback_deterministic() {
        let amount = Decimal::from_str("100").unwrap();
        let mk = |id: Option<&str>| {
            TradeLeg::compute_event_key(
                id,
                &pair(),
                NetworkKey::Avalanche,
                TradeAction::Buy,
                TimeS::new(1000),
                &amount,
            )
        };
        let key1 = mk(None);
        let key2 = mk(Some(""));
        assert!(key1.starts_with("hash:"));
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 5 + 32);
    }

    #[test]
    fn test_event_key_differs_by_field() {
        let a = TradeLeg::compute_event_key(
            None,
            &pair(),
            NetworkKey::Avalanche,
            TradeAction::Buy,
            TimeS::new(1000),
            &Decimal::from_str("100").unwrap(),
        );
        let b = TradeLeg::compute_event_key(
            None,
            &pair(),
            NetworkKey::Arbitrum,
            TradeAction::Buy,
            TimeS::new(1000),
            &Decimal::from_str("100").unwrap(),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_legacy_backfills_price() {
        let mut leg = make_leg(1000, 1060);
        leg.schema_version = 1;
        leg.native_price_usdc = Decimal::zero();
        leg.normalize_legacy();
        assert_eq!(leg.native_price_usdc.to_canonical_string(), "25");
        assert_eq!(leg.schema_version, LEG_SCHEMA_VERSION);
    }

    #[test]
    fn test_normalize_legacy_current_version_untouched() {
        let mut leg = make_leg(1000, 1060);
        let before = leg.clone();
        leg.normalize_legacy();
        assert_eq!(leg, before);
    }

    #[test]
    fn test_serde_roundtrip() {
        let leg = make_leg(1000, 1060);
        let json = serde_json::to_string(&leg).unwrap();
        let back: TradeLeg = serde_json::from_str(&json).unwrap();
        assert_eq!(leg, back);
    }
}
