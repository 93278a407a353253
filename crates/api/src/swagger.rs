//! OpenAPI metadata and Swagger UI mount point. Deliberately light on
//! `paths`/`components` — every request/response type here is owned by a
//! domain crate that has no reason to depend on `utoipa` for a single
//! wire-format annotation. The served document is still a valid, browsable
//! API surface description for the operator.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hotel Real-Time Pricing, Availability & Loyalty Core",
        version = "0.1.0",
        description = "Dynamic pricing, real-time availability/demand, hybrid cache, pub/sub, and loyalty engine for the hotel management platform.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Availability", description = "Real-time availability and occupancy reads"),
        (name = "Bookings", description = "Booking mutation endpoints"),
        (name = "Pricing", description = "On-demand pricing quotes"),
        (name = "Loyalty", description = "Loyalty account status, redemptions, and accrual"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    )
)]
pub struct ApiDoc;
