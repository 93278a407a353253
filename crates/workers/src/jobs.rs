//! The six background workers, each a [`Job`] registered with the
//! [`Scheduler`](crate::scheduler::Scheduler) on its own cadence.

use crate::directory::HotelDirectory;
use crate::scheduler::Job;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_cache::hybrid::HybridCache;
use hotel_core::error::HotelResult;
use hotel_core::event_bus::{DomainEvent, EventSink};
use hotel_core::types::{DemandLevel, RoomType};
use hotel_availability::AvailabilityService;
use hotel_loyalty::LoyaltyEngine;
use hotel_pricing::{CompetitorProvider, PricingEngine};
use hotel_pubsub::PubSubHub;
use hotel_store::StoreGateway;
use std::sync::Arc;
use tracing::{debug, info};

/// Periodic demand refresh: re-reads each tracked hotel's demand level and
/// raises `demand-surge-alert` when it crosses into High/VeryHigh/Critical.
pub struct DemandRefreshJob {
    pricing: Arc<PricingEngine>,
    events: Arc<dyn EventSink>,
    directory: Arc<HotelDirectory>,
}

impl DemandRefreshJob {
    pub fn new(pricing: Arc<PricingEngine>, events: Arc<dyn EventSink>, directory: Arc<HotelDirectory>) -> Self {
        Self { pricing, events, directory }
    }
}

#[async_trait]
impl Job for DemandRefreshJob {
    fn name(&self) -> &'static str {
        "demand-refresh"
    }

    async fn run(&self, now: DateTime<Utc>) -> HotelResult<()> {
        let today = now.date_naive();
        for hotel_id in self.directory.snapshot() {
            for room_type in RoomType::ALL {
                let level = self.pricing.demand_level(&hotel_id, room_type, today).await?;
                if matches!(level, DemandLevel::High | DemandLevel::VeryHigh | DemandLevel::Critical) {
                    self.events.emit(DomainEvent::DemandSurgeAlert {
                        hotel_id: hotel_id.clone(),
                        room_type,
                        level,
                        emitted_at: now,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Precomputes availability (and, transitively, pricing) for the next
/// `horizon_days` so guest-facing reads hit a warm cache.
pub struct CacheWarmingJob {
    availability: Arc<AvailabilityService>,
    directory: Arc<HotelDirectory>,
    horizon_days: i64,
}

impl CacheWarmingJob {
    pub fn new(availability: Arc<AvailabilityService>, directory: Arc<HotelDirectory>, horizon_days: i64) -> Self {
        Self { availability, directory, horizon_days }
    }
}

#[async_trait]
impl Job for CacheWarmingJob {
    fn name(&self) -> &'static str {
        "cache-warming"
    }

    async fn run(&self, now: DateTime<Utc>) -> HotelResult<()> {
        for hotel_id in self.directory.snapshot() {
            let warmed = self.availability.warm(&hotel_id, self.horizon_days, now).await?;
            debug!(hotel = %hotel_id, warmed, "cache warmed");
        }
        Ok(())
    }
}

/// Keeps the hourly competitor-price cache fresh for every tracked hotel so
/// the pricing hot path never blocks on a live fetch.
pub struct CompetitorRefreshJob {
    competitor: Arc<dyn CompetitorProvider>,
    directory: Arc<HotelDirectory>,
}

impl CompetitorRefreshJob {
    pub fn new(competitor: Arc<dyn CompetitorProvider>, directory: Arc<HotelDirectory>) -> Self {
        Self { competitor, directory }
    }
}

#[async_trait]
impl Job for CompetitorRefreshJob {
    fn name(&self) -> &'static str {
        "competitor-refresh"
    }

    async fn run(&self, _now: DateTime<Utc>) -> HotelResult<()> {
        for hotel_id in self.directory.snapshot() {
            if let Err(err) = self.competitor.fetch(&hotel_id).await {
                debug!(hotel = %hotel_id, error = %err, "competitor provider unavailable during refresh");
            }
        }
        Ok(())
    }
}

/// Evicts expired entries from the local cache tier. The shared tier
/// expires entries on its own TTL; this sweep only covers the process-local
/// fallback tier.
pub struct ExpiredCacheSweepJob {
    cache: Arc<HybridCache>,
}

impl ExpiredCacheSweepJob {
    pub fn new(cache: Arc<HybridCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Job for ExpiredCacheSweepJob {
    fn name(&self) -> &'static str {
        "expired-cache-sweep"
    }

    async fn run(&self, _now: DateTime<Utc>) -> HotelResult<()> {
        let evicted = self.cache.local_maintenance();
        metrics::counter!("cache.sweep_evicted").increment(evicted as u64);
        Ok(())
    }
}

/// Daily rollover: reads Hub counters and stamps each tracked hotel's
/// performance-metrics snapshot, broadcasting a dashboard update.
pub struct MetricRolloverJob {
    store: Arc<dyn StoreGateway>,
    hub: Arc<PubSubHub>,
    events: Arc<dyn EventSink>,
    directory: Arc<HotelDirectory>,
}

impl MetricRolloverJob {
    pub fn new(store: Arc<dyn StoreGateway>, hub: Arc<PubSubHub>, events: Arc<dyn EventSink>, directory: Arc<HotelDirectory>) -> Self {
        Self { store, hub, events, directory }
    }
}

#[async_trait]
impl Job for MetricRolloverJob {
    fn name(&self) -> &'static str {
        "metric-rollover"
    }

    async fn run(&self, now: DateTime<Utc>) -> HotelResult<()> {
        let snapshot = self.hub.metrics_snapshot();
        info!(
            price_updates = snapshot.price_updates,
            demand_alerts = snapshot.demand_alerts,
            revenue_optimizations = snapshot.revenue_optimizations,
            loyalty_events = snapshot.loyalty_events,
            "hub metrics rollover"
        );

        for hotel_id in self.directory.snapshot() {
            let mut hotel = self.store.get_hotel(&hotel_id).await?;
            hotel.performance_metrics.snapshot_at = Some(now);
            self.store.put_hotel(hotel).await?;
            self.events.emit(DomainEvent::YieldDashboardUpdate {
                hotel_id,
                emitted_at: now,
            });
        }
        Ok(())
    }
}

/// Wraps the Loyalty Engine's daily expiry sweep as a schedulable job.
pub struct LoyaltyExpiryScanJob {
    loyalty: Arc<LoyaltyEngine>,
}

impl LoyaltyExpiryScanJob {
    pub fn new(loyalty: Arc<LoyaltyEngine>) -> Self {
        Self { loyalty }
    }
}

#[async_trait]
impl Job for LoyaltyExpiryScanJob {
    fn name(&self) -> &'static str {
        "loyalty-expiry-scan"
    }

    async fn run(&self, _now: DateTime<Utc>) -> HotelResult<()> {
        let report = self.loyalty.run_expiry_scan().await?;
        info!(alerts = report.alerts_emitted, expired = report.transactions_expired, "loyalty expiry scan complete");
        Ok(())
    }
}
