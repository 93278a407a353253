//! Real-time delivery: the Pub/Sub Hub (room membership, direct addressing,
//! offline queues) and the Price-Watch Subsystem built on top of it.

pub mod hub;
pub mod watch;

pub use hub::{HubMetricsSnapshot, PubSubHub, SessionId};
pub use watch::{PriceWatch, WatchRegistry};
