//! Domain types and determinism layer for the trade-leg ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeS, TokenPair, TradeAction, LegStatus
//! - Canonical network identities and the total label resolver
//! - TradeLeg / CompletedTrade / Summary records with canonical JSON
//! - The strictly validated ingestion boundary type
//! - Stable leg ordering for deterministic matching passes

pub mod decimal;
pub mod event;
pub mod leg;
pub mod network;
pub mod ordering;
pub mod primitives;
pub mod summary;
pub mod trade;

pub use decimal::Decimal;
pub use event::{EventValidationError, RawLegEvent, ValidatedEvent};
pub use leg::{LegMeta, TradeLeg, LEG_SCHEMA_VERSION};
pub use network::{resolve_network, NetworkDescriptor, NetworkKey};
pub use ordering::{sort_legs_oldest_first, LegOrderingKey};
pub use primitives::{LegStatus, TimeS, TokenPair, TradeAction};
pub use summary::{
    streaming_mean, BucketStats, CrossNetworkStats, GasTrend, ProtocolStats, Summary, TokenStats,
};
pub use trade::{CompletedTrade, TradeCategory};
