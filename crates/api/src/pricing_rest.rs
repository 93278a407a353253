//! Dynamic Pricing Engine REST endpoint — an on-demand quote outside the
//! availability read path, used by internal tools and the booking UI's
//! price-confirmation step.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use hotel_core::loyalty::LoyaltyTier;
use hotel_core::types::{HotelId, RoomType};
use hotel_pricing::{PricingQuote, PricingRequest};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub room_type: RoomType,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub loyalty_tier: Option<LoyaltyTier>,
    pub promo_code: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub weekly_occupancy_ratio: f64,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// POST /v1/hotels/{hotel_id}/pricing/quote
pub async fn handle_quote(
    State(state): State<AppState>,
    Path(hotel_id): Path<String>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<PricingQuote>> {
    let now = state.clock.now();
    let hotel_id = HotelId::from(hotel_id);
    let hotel = state.store.get_hotel(&hotel_id).await?;
    let rooms = state.store.get_rooms_for_hotel(&hotel_id).await?;
    let room = rooms
        .iter()
        .find(|r| r.room_type == request.room_type)
        .cloned()
        .ok_or_else(|| hotel_core::error::HotelError::NotFound(format!("room type {:?} at hotel {hotel_id}", request.room_type)))?;

    let advance_days = (request.check_in - now.date_naive()).num_days().max(0);
    let pricing_request = PricingRequest {
        room_type: request.room_type,
        check_in: request.check_in,
        check_out: request.check_out,
        guest_count: request.guest_count,
        advance_days,
        loyalty_tier: request.loyalty_tier,
        promo_code: request.promo_code,
        currency: request.currency,
        weekly_occupancy_ratio: request.weekly_occupancy_ratio,
    };

    let quote = state.pricing.quote(&hotel, &room, pricing_request, now).await?;
    metrics::counter!("api.pricing_quotes").increment(1);
    Ok(Json(quote))
}
