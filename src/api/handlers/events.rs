use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::models::EventRecord;
use crate::AppState;

use super::ApiResponse;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Return records with a sequence strictly greater than this.
    #[serde(default)]
    pub after: u64,
    pub limit: Option<usize>,
}

/// GET /api/events: journal replay for indexers catching up
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<EventRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let records = state.registry.events_after(query.after, limit).await;
    Json(ApiResponse::ok(records))
}
