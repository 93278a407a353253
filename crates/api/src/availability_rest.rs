//! Real-Time Availability & Demand Service REST endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use hotel_availability::AvailabilityView;
use hotel_core::types::HotelId;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// GET /v1/hotels/{hotel_id}/availability
pub async fn handle_availability(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityView>> {
    let now = state.clock.now();
    let view = state
        .availability
        .get_availability(&HotelId::from(hotel_id), query.check_in, query.check_out, &query.currency, now)
        .await?;
    metrics::counter!("api.availability_requests").increment(1);
    Ok(Json(view))
}

/// GET /v1/hotels/{hotel_id}/occupancy
pub async fn handle_occupancy(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
) -> ApiResult<Json<AvailabilityView>> {
    let now = state.clock.now();
    let view = state.availability.get_real_time_occupancy(&HotelId::from(hotel_id), now).await?;
    Ok(Json(view))
}
