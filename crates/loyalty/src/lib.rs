//! Loyalty Engine crate: accrual, tier evaluation, redemption, expiry
//! sweeps, and campaign fan-out over the append-only transaction ledger.

pub mod engine;

pub use engine::{ExpiryScanReport, LoyaltyEngine, RedemptionResult};
