pub mod health;
pub mod legs;
pub mod summary;
pub mod trades;

use crate::db::Repository;
use crate::orchestration::Ingestor;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub ingestor: Arc<Ingestor>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/legs", post(legs::post_leg).get(legs::get_legs))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/trades/:trade_id", delete(trades::delete_trade))
        .route("/v1/summary", get(summary::get_summary))
        .route("/v1/summary/networks", get(summary::get_network_comparison))
        .route("/v1/summary/recompute", post(summary::post_recompute))
        .layer(cors)
        .with_state(state)
}

/// Parse an optional `network` query value into a canonical key.
pub(crate) fn parse_network_filter(
    raw: Option<&str>,
) -> Result<Option<crate::domain::NetworkKey>, crate::error::AppError> {
    match raw {
        Some("") | None => Ok(None),
        Some(label) => crate::domain::NetworkKey::from_canonical(label)
            .map(Some)
            .ok_or_else(|| {
                crate::error::AppError::BadRequest(format!("Unknown network: {}", label))
            }),
    }
}
