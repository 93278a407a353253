//! Assembles every REST/WebSocket surface onto one axum [`Router`], matching
//! the teacher's per-domain `Router::new().route(...).with_state(...)`
//! then `.merge(...)` pattern.

use crate::state::AppState;
use crate::{availability_rest, booking_rest, loyalty_rest, ops_rest, pricing_rest, ws};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full application router. `cors_origin` is `"*"` for a
/// permissive dev deployment or a single explicit origin otherwise.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let availability_routes = Router::new()
        .route("/v1/hotels/{hotel_id}/availability", get(availability_rest::handle_availability))
        .route("/v1/hotels/{hotel_id}/occupancy", get(availability_rest::handle_occupancy))
        .with_state(state.clone());

    let booking_routes = Router::new()
        .route("/v1/bookings", post(booking_rest::handle_create_booking))
        .route("/v1/bookings/{booking_id}/cancel", post(booking_rest::handle_cancel_booking))
        .route("/v1/bookings/{booking_id}/complete", post(booking_rest::handle_complete_booking))
        .with_state(state.clone());

    let pricing_routes = Router::new()
        .route("/v1/hotels/{hotel_id}/pricing/quote", post(pricing_rest::handle_quote))
        .with_state(state.clone());

    let loyalty_routes = Router::new()
        .route("/v1/loyalty/{user_id}", get(loyalty_rest::handle_status))
        .route("/v1/loyalty/{user_id}/redemptions", get(loyalty_rest::handle_redemptions))
        .route("/v1/loyalty/{user_id}/redeem", post(loyalty_rest::handle_redeem))
        .with_state(state.clone());

    let ws_routes = Router::new().route("/v1/ws", get(ws::handle_ws)).with_state(state.clone());

    let ops_routes = Router::new()
        .route("/health", get(ops_rest::health_check))
        .route("/ready", get(ops_rest::readiness))
        .route("/live", get(ops_rest::liveness))
        .with_state(state);

    let cors = if cors_origin == "*" {
        CorsLayer::permissive()
    } else {
        CorsLayer::new().allow_origin(
            cors_origin
                .parse::<axum::http::HeaderValue>()
                .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*")),
        )
    };

    Router::new()
        .merge(availability_routes)
        .merge(booking_routes)
        .merge(pricing_routes)
        .merge(loyalty_routes)
        .merge(ws_routes)
        .merge(ops_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", crate::swagger::ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
