use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::{Identity, Market, MarketStatus};
use crate::registry::{MarketFilter, NewMarket, RegistryError, ResolutionInput};
use crate::AppState;

use super::ApiResponse;

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListMarketsQuery {
    pub status: Option<String>,
    pub creator: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ListMarketsQuery {
    fn into_filter(self) -> Result<MarketFilter, AppError> {
        let status = self
            .status
            .map(|s| {
                MarketStatus::from_api_str(&s)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown status {s:?}")))
            })
            .transpose()?;
        let creator = self
            .creator
            .map(|c| {
                c.parse::<Identity>()
                    .map_err(|e| AppError::BadRequest(format!("invalid creator: {e}")))
            })
            .transpose()?;

        Ok(MarketFilter {
            status,
            creator,
            offset: self.offset.unwrap_or(0),
            limit: Some(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/markets: list markets by ascending id
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListMarketsQuery>,
) -> Result<Json<ApiResponse<Vec<Market>>>, AppError> {
    let filter = query.into_filter()?;
    let markets = state.registry.markets(&filter).await;
    Ok(Json(ApiResponse::ok(markets)))
}

/// POST /api/markets: open a market on behalf of the caller
pub async fn create(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<NewMarket>,
) -> Result<(StatusCode, Json<ApiResponse<Market>>), AppError> {
    let id = state.registry.create(body, &caller).await?;
    let market = fetch(&state, id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(market))))
}

/// GET /api/markets/:id
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    let market = fetch(&state, id).await?;
    Ok(Json(ApiResponse::ok(market)))
}

/// POST /api/markets/:id/resolve: record the oracle verdict (resolver only)
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(caller): Caller,
    Json(body): Json<ResolutionInput>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    state.registry.resolve(id, body, &caller).await?;
    let market = fetch(&state, id).await?;
    Ok(Json(ApiResponse::ok(market)))
}

/// POST /api/markets/:id/cancel: withdraw an open market (creator or owner)
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Caller(caller): Caller,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    state.registry.cancel(id, &caller).await?;
    let market = fetch(&state, id).await?;
    Ok(Json(ApiResponse::ok(market)))
}

async fn fetch(state: &AppState, id: u64) -> Result<Market, AppError> {
    state
        .registry
        .market(id)
        .await
        .ok_or(AppError::Registry(RegistryError::MarketNotFound(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_into_filter() {
        let filter = ListMarketsQuery {
            status: Some("Resolved".into()),
            creator: None,
            offset: Some(3),
            limit: Some(10_000),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, Some(MarketStatus::Resolved));
        assert_eq!(filter.offset, 3);
        assert_eq!(filter.limit, Some(MAX_PAGE_SIZE));
    }

    #[test]
    fn test_query_rejects_unknown_status() {
        let result = ListMarketsQuery {
            status: Some("expired".into()),
            ..Default::default()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
