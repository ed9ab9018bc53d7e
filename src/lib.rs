pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod pricing;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CompletedTrade, Decimal, LegStatus, NetworkKey, RawLegEvent, Summary, TimeS, TokenPair,
    TradeAction, TradeCategory, TradeLeg,
};
pub use error::AppError;
pub use orchestration::{IngestOutcome, Ingestor, NoopHook, TradeHook};
pub use pricing::{CachedPriceFeed, HttpPriceSource, MockPriceSource, PriceSource};
