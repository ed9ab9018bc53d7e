//! Strictly validated ingestion boundary for new leg events.
//!
//! The external execution engine hands legs over as loosely shaped webhook
//! payloads. Everything structural (action, product, timestamps) is checked
//! here so defects never reach the matching or aggregation logic; financial
//! implausibility (zero amounts, missing gas) is NOT an error; such legs
//! are stored and simply never match.

use crate::domain::{Decimal, LegStatus, TimeS, TokenPair, TradeAction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A new-leg event as produced by the external execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLegEvent {
    /// Producer's own event id, used as the idempotency key when present.
    #[serde(default)]
    pub event_id: Option<String>,
    /// "buy" | "sell" | "stop_loss" | "take_profit" (case/spelling tolerant).
    pub action: String,
    /// Product string, e.g. "WAVAX/USDC".
    pub product: String,
    /// Free-form network label; absent resolves to the configured default.
    #[serde(default)]
    pub network: Option<String>,
    /// Quote-currency size of the leg.
    pub amount_usdc: Decimal,
    /// When the originating signal was received (unix seconds).
    pub signal_timestamp: i64,
    /// When the on-chain operation confirmed; defaults to the signal time.
    #[serde(default)]
    pub execution_timestamp: Option<i64>,
    /// Producer-reported status; unknown labels are stored as pending.
    #[serde(default)]
    pub status: Option<String>,
    /// Raw gas units consumed.
    #[serde(default)]
    pub gas_used: Option<u64>,
    /// Raw gas price in wei.
    #[serde(default)]
    pub gas_price_wei: Option<u64>,
    /// Expected quote-currency output from the router quote.
    #[serde(default)]
    pub expected_out_usdc: Option<Decimal>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub router: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Structural fields extracted from a valid event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEvent {
    pub action: TradeAction,
    pub token_pair: TokenPair,
    pub status: LegStatus,
    pub signal_ts: TimeS,
    pub execution_ts: TimeS,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventValidationError {
    #[error("unknown action label: {0:?}")]
    UnknownAction(String),
    #[error("malformed product string: {0:?}")]
    MalformedProduct(String),
    #[error("non-positive signal timestamp: {0}")]
    BadSignalTimestamp(i64),
}

impl RawLegEvent {
    /// Validate the structural fields of the event.
    pub fn validate(&self) -> Result<ValidatedEvent, EventValidationError> {
        let action = TradeAction::parse(&self.action)
            .ok_or_else(|| EventValidationError::UnknownAction(self.action.clone()))?;

        let token_pair = TokenPair::parse(&self.product)
            .ok_or_else(|| EventValidationError::MalformedProduct(self.product.clone()))?;

        if self.signal_timestamp <= 0 {
            return Err(EventValidationError::BadSignalTimestamp(self.signal_timestamp));
        }
        let signal_ts = TimeS::new(self.signal_timestamp);
        let execution_ts = TimeS::new(self.execution_timestamp.unwrap_or(self.signal_timestamp));

        Ok(ValidatedEvent {
            action,
            token_pair,
            status: LegStatus::parse(self.status.as_deref()),
            signal_ts,
            execution_ts,
        })
    }
}
