//! HTTP + WebSocket surface: REST handlers per domain crate, a realtime
//! WebSocket upgrade backed by the Pub/Sub Hub, and the router that binds
//! them together behind Prometheus metrics and an OpenAPI document.

pub mod availability_rest;
pub mod booking_rest;
pub mod error;
pub mod loyalty_rest;
pub mod ops_rest;
pub mod pricing_rest;
pub mod router;
pub mod state;
pub mod swagger;
pub mod ws;

pub use router::build_router;
pub use state::AppState;
