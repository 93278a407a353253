//! Maps `HotelError` onto HTTP status codes. Handlers return `ApiResult<T>`
//! and let this conversion build the JSON error body from
//! `HotelError::to_response()` — no handler constructs a status code itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hotel_core::error::{ErrorKind, HotelError};

pub type ApiResult<T> = Result<T, ApiError>;

pub struct ApiError(pub HotelError);

impl From<HotelError> for ApiError {
    fn from(err: HotelError) -> Self {
        Self(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Pricing => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::CacheUnavailable | ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::QueueFull => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.0.to_response();
        let status = status_for(body.kind);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
        }
        (status, Json(body)).into_response()
    }
}
