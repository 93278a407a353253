//! Shared application state handed to every REST/WebSocket handler via
//! axum's `.with_state()`.

use hotel_availability::AvailabilityService;
use hotel_core::clock::Clock;
use hotel_loyalty::LoyaltyEngine;
use hotel_pricing::PricingEngine;
use hotel_pubsub::hub::PubSubHub;
use hotel_pubsub::watch::WatchRegistry;
use hotel_store::StoreGateway;
use hotel_workers::directory::HotelDirectory;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreGateway>,
    pub availability: Arc<AvailabilityService>,
    pub pricing: Arc<PricingEngine>,
    pub loyalty: Arc<LoyaltyEngine>,
    pub hub: Arc<PubSubHub>,
    pub watches: Arc<WatchRegistry>,
    pub directory: Arc<HotelDirectory>,
    pub clock: Arc<dyn Clock>,
    pub node_id: String,
    pub start_time: Instant,
}
