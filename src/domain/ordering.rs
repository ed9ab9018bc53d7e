//! Stable leg ordering for deterministic matching passes.

use crate::domain::TradeLeg;

/// Stable ordering key for legs.
///
/// The matcher scans entries oldest-first; legs sharing a signal timestamp
/// fall back to ingestion time, then to the leg id so the order never
/// depends on query order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LegOrderingKey {
    pub signal_ts: i64,
    pub ingested_ts: i64,
    pub leg_id: String,
}

impl LegOrderingKey {
    /// Create an ordering key from a leg.
    pub fn from_leg(leg: &TradeLeg) -> Self {
        LegOrderingKey {
            signal_ts: leg.signal_ts.as_secs(),
            ingested_ts: leg.ingested_ts.as_secs(),
            leg_id: leg.leg_id.clone(),
        }
    }
}

/// Sort legs oldest-first, deterministically.
pub fn sort_legs_oldest_first(legs: &mut [TradeLeg]) {
    legs.sort_by(|a, b| LegOrderingKey::from_leg(a).cmp(&LegOrderingKey::from_leg(b)));
}
