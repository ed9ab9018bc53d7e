//! Downstream notification hook for newly completed trades.

use crate::domain::CompletedTrade;
use async_trait::async_trait;

/// Invoked after a match has been settled and committed. Implementations
/// must tolerate redelivery: a crash between commit and notification means
/// the hook may never fire for a trade, and callers re-deliver at their own
/// discretion.
#[async_trait]
pub trait TradeHook: Send + Sync {
    async fn on_trade_completed(&self, trade: &CompletedTrade);
}

/// Hook that does nothing; the default when no downstream consumer is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl TradeHook for NoopHook {
    async fn on_trade_completed(&self, _trade: &CompletedTrade) {}
}
