//! Booking mutation endpoints. These are the write path that feeds the
//! Availability Service's invalidation + demand-tracking hook
//! (`on_booking_changed`) and, on completion, the Loyalty Engine's accrual.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use hotel_availability::BookingAction;
use hotel_core::error::HotelError;
use hotel_core::loyalty::LoyaltyAccount;
use hotel_core::types::{Booking, BookingId, BookingLine, BookingStatus, HotelId, RoomType, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub id: String,
    pub hotel_id: String,
    pub user_id: String,
    pub rooms: Vec<BookingLine>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_price: f64,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

/// POST /v1/bookings — creates a `CONFIRMED` booking and triggers the
/// availability/demand invalidation hook.
pub async fn handle_create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> ApiResult<Json<BookingResponse>> {
    let now = state.clock.now();
    let hotel_id = HotelId::from(request.hotel_id);
    let booking = Booking {
        id: BookingId::from(request.id),
        hotel_id: hotel_id.clone(),
        user_id: UserId::from(request.user_id),
        rooms: request.rooms.clone(),
        check_in: request.check_in,
        check_out: request.check_out,
        status: BookingStatus::Confirmed,
        total_price: request.total_price,
    };
    state.store.put_booking(booking.clone()).await?;

    let lines: Vec<(RoomType, u32)> = request.rooms.iter().map(|l| (l.room_type, l.quantity)).collect();
    state
        .availability
        .on_booking_changed(&hotel_id, request.check_in, request.check_out, &lines, BookingAction::Book, now)
        .await?;
    state.directory.register(hotel_id);

    metrics::counter!("api.bookings_created").increment(1);
    Ok(Json(BookingResponse { booking }))
}

/// POST /v1/bookings/{booking_id}/cancel
pub async fn handle_cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<BookingResponse>> {
    let now = state.clock.now();
    let mut booking = state.store.get_booking(&BookingId::from(booking_id)).await?;
    if booking.status == BookingStatus::Cancelled {
        return Err(ApiError(HotelError::Conflict("booking already cancelled".to_string())));
    }
    booking.status = BookingStatus::Cancelled;
    state.store.put_booking(booking.clone()).await?;

    let lines: Vec<(RoomType, u32)> = booking.rooms.iter().map(|l| (l.room_type, l.quantity)).collect();
    state
        .availability
        .on_booking_changed(&booking.hotel_id, booking.check_in, booking.check_out, &lines, BookingAction::Cancel, now)
        .await?;

    metrics::counter!("api.bookings_cancelled").increment(1);
    Ok(Json(BookingResponse { booking }))
}

#[derive(Debug, Serialize)]
pub struct CompleteBookingResponse {
    pub booking: Booking,
    pub loyalty_account: LoyaltyAccount,
}

/// POST /v1/bookings/{booking_id}/complete — marks the stay completed and
/// accrues loyalty points for `totalPrice`.
pub async fn handle_complete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<CompleteBookingResponse>> {
    let mut booking = state.store.get_booking(&BookingId::from(booking_id)).await?;
    booking.status = BookingStatus::Completed;
    state.store.put_booking(booking.clone()).await?;

    let loyalty_account = state
        .loyalty
        .accrue_for_booking(&booking.user_id, booking.id.clone(), booking.total_price)
        .await?;

    Ok(Json(CompleteBookingResponse { booking, loyalty_account }))
}
