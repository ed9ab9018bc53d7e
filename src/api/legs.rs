use super::{parse_network_filter, AppState};
use crate::domain::{RawLegEvent, TradeLeg};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub leg_id: String,
    pub duplicate: bool,
    pub completed_trade_ids: Vec<String>,
}

pub async fn post_leg(
    State(state): State<AppState>,
    Json(event): Json<RawLegEvent>,
) -> Result<Json<IngestResponse>, AppError> {
    let outcome = state.ingestor.ingest_leg(event).await?;
    Ok(Json(IngestResponse {
        leg_id: outcome.leg_id,
        duplicate: outcome.duplicate,
        completed_trade_ids: outcome.completed_trade_ids,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegsQuery {
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegsResponse {
    pub legs: Vec<LegDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegDto {
    pub leg_id: String,
    pub token_pair: String,
    pub network: String,
    pub action: String,
    pub status: String,
    pub signal_ts: i64,
    pub execution_ts: i64,
    pub amount_usdc: String,
    pub gas_cost_usdc: String,
    pub gas_cost_native: String,
    pub native_price_usdc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_out_usdc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub ingested_ts: i64,
}

pub async fn get_legs(
    Query(params): Query<LegsQuery>,
    State(state): State<AppState>,
) -> Result<Json<LegsResponse>, AppError> {
    let network = parse_network_filter(params.network.as_deref())?;
    let legs = state
        .repo
        .query_active_legs(network)
        .await?
        .into_iter()
        .map(leg_dto)
        .collect();
    Ok(Json(LegsResponse { legs }))
}

fn leg_dto(leg: TradeLeg) -> LegDto {
    LegDto {
        leg_id: leg.leg_id,
        token_pair: leg.token_pair.as_str().to_string(),
        network: leg.network.as_str().to_string(),
        action: leg.action.as_str().to_string(),
        status: leg.status.as_str().to_string(),
        signal_ts: leg.signal_ts.as_secs(),
        execution_ts: leg.execution_ts.as_secs(),
        amount_usdc: leg.amount_usdc.to_canonical_string(),
        gas_cost_usdc: leg.gas_cost_usdc.to_canonical_string(),
        gas_cost_native: leg.gas_cost_native.to_canonical_string(),
        native_price_usdc: leg.native_price_usdc.to_canonical_string(),
        expected_out_usdc: leg
            .meta
            .expected_out_usdc
            .map(|d| d.to_canonical_string()),
        tx_hash: leg.meta.tx_hash,
        ingested_ts: leg.ingested_ts.as_secs(),
    }
}
