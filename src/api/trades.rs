use super::{parse_network_filter, AppState};
use crate::domain::CompletedTrade;
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub trade_id: String,
    pub entry_leg_id: String,
    pub exit_leg_id: String,
    pub token_pair: String,
    pub networks: Vec<String>,
    pub cross_network: bool,
    pub category: String,
    pub gross_profit_usdc: String,
    pub gas_cost_usdc: String,
    pub net_profit_usdc: String,
    pub profit_pct: String,
    pub expected_gross_profit_usdc: String,
    pub actual_vs_expected_usdc: String,
    pub slippage_usdc: String,
    pub execution_efficiency_pct: String,
    pub signal_duration_ms: i64,
    pub execution_duration_ms: i64,
    pub efficiency_score: String,
    pub completed_ts: i64,
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let network = parse_network_filter(params.network.as_deref())?;
    let trades = state
        .repo
        .query_completed_trades(network)
        .await?
        .into_iter()
        .map(trade_dto)
        .collect();
    Ok(Json(TradesResponse { trades }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub trade_id: String,
    pub removed: bool,
}

pub async fn delete_trade(
    Path(trade_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RemoveResponse>, AppError> {
    if !state.ingestor.remove_trade(&trade_id).await? {
        return Err(AppError::NotFound(format!("No trade with id {}", trade_id)));
    }
    Ok(Json(RemoveResponse {
        trade_id,
        removed: true,
    }))
}

fn trade_dto(trade: CompletedTrade) -> TradeDto {
    TradeDto {
        trade_id: trade.trade_id,
        entry_leg_id: trade.entry_leg.leg_id.clone(),
        exit_leg_id: trade.exit_leg.leg_id.clone(),
        token_pair: trade.entry_leg.token_pair.as_str().to_string(),
        networks: trade
            .networks
            .iter()
            .map(|n| n.as_str().to_string())
            .collect(),
        cross_network: trade.cross_network,
        category: trade.category.as_str().to_string(),
        gross_profit_usdc: trade.gross_profit_usdc.to_canonical_string(),
        gas_cost_usdc: trade.gas_cost_usdc.to_canonical_string(),
        net_profit_usdc: trade.net_profit_usdc.to_canonical_string(),
        profit_pct: trade.profit_pct.to_canonical_string(),
        expected_gross_profit_usdc: trade.expected_gross_profit_usdc.to_canonical_string(),
        actual_vs_expected_usdc: trade.actual_vs_expected_usdc.to_canonical_string(),
        slippage_usdc: trade.slippage_usdc.to_canonical_string(),
        execution_efficiency_pct: trade.execution_efficiency_pct.to_canonical_string(),
        signal_duration_ms: trade.signal_duration_ms,
        execution_duration_ms: trade.execution_duration_ms,
        efficiency_score: trade.efficiency_score.to_canonical_string(),
        completed_ts: trade.completed_ts.as_secs(),
    }
}
