//! Domain event bus — trait for emitting routed events out of the pricing,
//! availability, demand, and loyalty subsystems into the pub/sub Hub.
//!
//! Modules accept an `Arc<dyn EventSink>` and never talk to the Hub's
//! socket layer directly; this keeps the Hub's wire format swappable and
//! makes every emitting module trivially testable with `CaptureSink`.

use crate::loyalty::{ExpiryUrgency, LoyaltyTier};
use crate::types::{CampaignId, DemandLevel, HotelId, RoomType, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A routed domain event. Each variant knows its own target rooms so the
/// Hub never hardcodes routing rules away from the event that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DomainEvent {
    AvailabilityUpdate {
        hotel_id: HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        emitted_at: DateTime<Utc>,
    },
    PriceUpdate {
        hotel_id: HotelId,
        room_type: RoomType,
        date: NaiveDate,
        new_price: f64,
        emitted_at: DateTime<Utc>,
    },
    PriceAlert {
        user_id: UserId,
        hotel_id: HotelId,
        room_type: RoomType,
        new_price: f64,
        max_price: f64,
        emitted_at: DateTime<Utc>,
    },
    DemandSurgeAlert {
        hotel_id: HotelId,
        room_type: RoomType,
        level: DemandLevel,
        emitted_at: DateTime<Utc>,
    },
    RevenueOptimization {
        hotel_id: HotelId,
        suggestion: String,
        emitted_at: DateTime<Utc>,
    },
    LoyaltyPointsEarned {
        user_id: UserId,
        points: i64,
        new_balance: i64,
        emitted_at: DateTime<Utc>,
    },
    LoyaltyTierUpgraded {
        user_id: UserId,
        old_tier: LoyaltyTier,
        new_tier: LoyaltyTier,
        bonus_points: Option<i64>,
        emitted_at: DateTime<Utc>,
    },
    LoyaltyPointsExpiryAlert {
        user_id: UserId,
        points_expiring: i64,
        urgency: ExpiryUrgency,
        expires_at: DateTime<Utc>,
        emitted_at: DateTime<Utc>,
    },
    LoyaltyPointsRedeemed {
        user_id: UserId,
        points_spent: i64,
        new_balance: i64,
        emitted_at: DateTime<Utc>,
    },
    CampaignUpdate {
        campaign_id: CampaignId,
        emitted_at: DateTime<Utc>,
    },
    CampaignOpportunity {
        campaign_id: CampaignId,
        tier: LoyaltyTier,
        emitted_at: DateTime<Utc>,
    },
    HotelCampaignNotification {
        campaign_id: CampaignId,
        hotel_id: HotelId,
        emitted_at: DateTime<Utc>,
    },
    YieldDashboardUpdate {
        hotel_id: HotelId,
        emitted_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Rooms this event fans out to, per the routing table. Direct,
    /// user-addressed deliveries are returned separately by `direct_user`.
    pub fn rooms(&self) -> Vec<String> {
        match self {
            DomainEvent::AvailabilityUpdate { hotel_id, .. } => {
                vec![format!("hotel:{hotel_id}"), "clients".to_string(), format!("price-watch:{hotel_id}")]
            }
            DomainEvent::PriceUpdate { hotel_id, .. } => {
                vec![format!("pricing:{hotel_id}"), format!("hotel:{hotel_id}")]
            }
            DomainEvent::PriceAlert { .. } => vec![],
            DomainEvent::DemandSurgeAlert { hotel_id, .. } => {
                vec![format!("demand:{hotel_id}"), format!("hotel:{hotel_id}"), "yield-admin".to_string()]
            }
            DomainEvent::RevenueOptimization { hotel_id, .. } => {
                vec!["revenue-monitoring".to_string(), format!("hotel:{hotel_id}")]
            }
            DomainEvent::LoyaltyPointsEarned { .. } => vec!["loyalty-admin".to_string()],
            DomainEvent::LoyaltyTierUpgraded { new_tier, .. } => {
                vec![format!("loyalty-tier:{new_tier:?}"), "loyalty-admin".to_string()]
            }
            DomainEvent::LoyaltyPointsExpiryAlert { .. } => vec![],
            DomainEvent::LoyaltyPointsRedeemed { .. } => vec!["loyalty-admin".to_string()],
            DomainEvent::CampaignUpdate { campaign_id, .. } => vec![format!("campaign:{campaign_id}")],
            DomainEvent::CampaignOpportunity { tier, .. } => vec![format!("loyalty-tier:{tier:?}")],
            DomainEvent::HotelCampaignNotification { hotel_id, .. } => vec![format!("loyalty-hotel:{hotel_id}")],
            DomainEvent::YieldDashboardUpdate { .. } => vec!["yield-admin".to_string()],
        }
    }

    /// Direct-addressed recipient for events sent to a specific user's socket.
    pub fn direct_user(&self) -> Option<&UserId> {
        match self {
            DomainEvent::PriceAlert { user_id, .. }
            | DomainEvent::LoyaltyPointsEarned { user_id, .. }
            | DomainEvent::LoyaltyTierUpgraded { user_id, .. }
            | DomainEvent::LoyaltyPointsExpiryAlert { user_id, .. }
            | DomainEvent::LoyaltyPointsRedeemed { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::AvailabilityUpdate { .. } => "availability-update",
            DomainEvent::PriceUpdate { .. } => "price-update",
            DomainEvent::PriceAlert { .. } => "price-alert",
            DomainEvent::DemandSurgeAlert { .. } => "demand-surge-alert",
            DomainEvent::RevenueOptimization { .. } => "revenue-optimization",
            DomainEvent::LoyaltyPointsEarned { .. } => "loyalty-points-earned",
            DomainEvent::LoyaltyTierUpgraded { .. } => "loyalty-tier-upgraded",
            DomainEvent::LoyaltyPointsExpiryAlert { .. } => "loyalty-points-expiry-alert",
            DomainEvent::LoyaltyPointsRedeemed { .. } => "loyalty-points-redeemed",
            DomainEvent::CampaignUpdate { .. } => "campaign-update",
            DomainEvent::CampaignOpportunity { .. } => "campaign-opportunity",
            DomainEvent::HotelCampaignNotification { .. } => "hotel-campaign-notification",
            DomainEvent::YieldDashboardUpdate { .. } => "yield-dashboard-update",
        }
    }
}

/// Trait for emitting domain events. The pub/sub Hub is the production
/// implementation; other modules only see this trait.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// No-op sink for modules that don't need event emission (e.g. isolated tests).
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// In-memory sink that captures events for assertions in tests.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
