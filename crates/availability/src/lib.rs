//! Real-Time Availability & Demand Service: room inventory vs. overlapping
//! bookings, orchestrating the Hybrid Cache, Pricing Engine, and cache
//! invalidation on booking mutations.

pub mod service;

pub use service::{AvailabilityService, AvailabilityView, BookingAction, RoomTypeAvailability, StoreBackedRecompute};
