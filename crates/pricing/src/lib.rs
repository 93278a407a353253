//! Dynamic Pricing Engine crate: demand tracking, the stateless pricing
//! algorithm, and the external provider contracts it depends on.

pub mod demand;
pub mod engine;
pub mod providers;

pub use demand::{DemandRecompute, DemandTracker};
pub use engine::{PricingEngine, PricingQuote, PricingRequest};
pub use providers::{
    CachingCompetitorProvider, CompetitorProvider, CompetitorSnapshot, ConversionResult, CurrencyProvider,
};
