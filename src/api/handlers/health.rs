use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state.registry.summary().await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "market_count": summary.market_count,
            "open_markets": summary.open_markets,
            "last_sequence": summary.last_sequence,
        })),
    )
}
