//! Ingestion orchestration: the serialized pass and the completion hook.

pub mod hook;
pub mod ingest;

pub use hook::{NoopHook, TradeHook};
pub use ingest::{IngestError, IngestOutcome, Ingestor};
