//! Matching, P&L, and aggregation logic. Everything here is pure over
//! in-memory values; persistence lives in [`crate::db`].

pub mod gas;
pub mod matcher;
pub mod pnl;
pub mod summary;

pub use gas::{normalize_gas, GasCost};
pub use matcher::{MatchConfig, MatchPlanner, PlannedMatch};
pub use pnl::build_completed_trade;
pub use summary::SummaryAggregator;
