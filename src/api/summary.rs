use super::AppState;
use crate::domain::{Decimal, NetworkKey, Summary};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    Ok(Json(state.repo.load_summary().await?))
}

pub async fn post_recompute(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    Ok(Json(state.ingestor.recompute_summary().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkComparisonResponse {
    pub cross_network_trades: u64,
    pub networks: Vec<NetworkComparisonDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkComparisonDto {
    pub network: String,
    pub name: String,
    pub chain_id: u64,
    pub native_currency: String,
    pub trades: u64,
    pub win_rate: String,
    pub net_profit_usdc: String,
    pub avg_net_profit_usdc: String,
    pub avg_gas_cost_usdc: String,
    pub avg_efficiency_score: String,
}

/// Side-by-side per-network view, best net profit first.
pub async fn get_network_comparison(
    State(state): State<AppState>,
) -> Result<Json<NetworkComparisonResponse>, AppError> {
    let summary = state.repo.load_summary().await?;

    let mut networks: Vec<NetworkComparisonDto> = NetworkKey::ALL
        .iter()
        .filter_map(|network| {
            let stats = summary.by_network.get(network.as_str())?;
            let descriptor = network.descriptor();
            let avg_gas = summary
                .cross_network
                .avg_gas_by_network
                .get(network.as_str())
                .copied()
                .unwrap_or_else(Decimal::zero);
            let avg_efficiency = summary
                .cross_network
                .avg_efficiency_by_network
                .get(network.as_str())
                .copied()
                .unwrap_or_else(Decimal::zero);

            Some(NetworkComparisonDto {
                network: network.as_str().to_string(),
                name: descriptor.name.to_string(),
                chain_id: descriptor.chain_id,
                native_currency: descriptor.native_currency.to_string(),
                trades: stats.trades,
                win_rate: stats.win_rate.to_canonical_string(),
                net_profit_usdc: stats.net_profit_usdc.to_canonical_string(),
                avg_net_profit_usdc: stats.avg_net_profit_usdc.to_canonical_string(),
                avg_gas_cost_usdc: avg_gas.to_canonical_string(),
                avg_efficiency_score: avg_efficiency.to_canonical_string(),
            })
        })
        .collect();

    networks.sort_by(|a, b| {
        let pa = summary.by_network[&a.network].net_profit_usdc;
        let pb = summary.by_network[&b.network].net_profit_usdc;
        pb.cmp(&pa).then_with(|| a.network.cmp(&b.network))
    });

    Ok(Json(NetworkComparisonResponse {
        cross_network_trades: summary.cross_network.cross_network_trades,
        networks,
    }))
}
