use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::Identity;
use crate::registry::RegistrySummary;
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct SetFeeRequest {
    pub fee: Decimal,
}

#[derive(Deserialize)]
pub struct SetResolverRequest {
    pub resolver: Identity,
}

#[derive(Deserialize)]
pub struct TransferOwnershipRequest {
    pub owner: Identity,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub to: Identity,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct PayoutBalance {
    pub address: Identity,
    pub credited: Decimal,
}

/// GET /api/registry
pub async fn summary(State(state): State<AppState>) -> Json<ApiResponse<RegistrySummary>> {
    Json(ApiResponse::ok(state.registry.summary().await))
}

/// PUT /api/registry/fee (owner only)
pub async fn set_fee(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<SetFeeRequest>,
) -> Result<Json<ApiResponse<RegistrySummary>>, AppError> {
    state.registry.set_fee(body.fee, &caller).await?;
    Ok(Json(ApiResponse::ok(state.registry.summary().await)))
}

/// PUT /api/registry/resolver (owner only)
pub async fn set_resolver(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<SetResolverRequest>,
) -> Result<Json<ApiResponse<RegistrySummary>>, AppError> {
    state.registry.set_resolver(body.resolver, &caller).await?;
    Ok(Json(ApiResponse::ok(state.registry.summary().await)))
}

/// PUT /api/registry/owner (owner only)
pub async fn transfer_ownership(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<TransferOwnershipRequest>,
) -> Result<Json<ApiResponse<RegistrySummary>>, AppError> {
    state.registry.transfer_ownership(body.owner, &caller).await?;
    Ok(Json(ApiResponse::ok(state.registry.summary().await)))
}

/// POST /api/registry/withdraw (owner only)
pub async fn withdraw(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<RegistrySummary>>, AppError> {
    state
        .registry
        .withdraw(body.to, body.amount, &caller)
        .await?;
    Ok(Json(ApiResponse::ok(state.registry.summary().await)))
}

/// GET /api/payouts/:address: total withdrawn to an address
pub async fn payouts(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<PayoutBalance>>, AppError> {
    let address: Identity = address
        .parse()
        .map_err(|e| AppError::BadRequest(format!("invalid address: {e}")))?;
    let credited = state.payouts.credited(&address);
    Ok(Json(ApiResponse::ok(PayoutBalance { address, credited })))
}
