//! Loyalty Event & Notification Engine REST endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use hotel_core::loyalty::{LoyaltyAccount, RedemptionOption};
use hotel_core::types::UserId;
use hotel_loyalty::engine::RedemptionResult;
use serde::Deserialize;

/// GET /v1/loyalty/{user_id}
pub async fn handle_status(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Json<LoyaltyAccount>> {
    let account = state.loyalty.status(&UserId::from(user_id)).await?;
    Ok(Json(account))
}

/// GET /v1/loyalty/{user_id}/redemptions
pub async fn handle_redemptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<RedemptionOption>>> {
    let options = state.loyalty.available_redemptions(&UserId::from(user_id)).await?;
    Ok(Json(options))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub option: RedemptionOption,
    pub points: i64,
}

/// POST /v1/loyalty/{user_id}/redeem
pub async fn handle_redeem(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RedeemRequest>,
) -> ApiResult<Json<RedemptionResult>> {
    let result = state.loyalty.redeem(&UserId::from(user_id), request.option, request.points).await?;
    metrics::counter!("api.loyalty_redemptions").increment(1);
    Ok(Json(result))
}
