//! Shared domain model: hotels, rooms, bookings, loyalty ledger entries,
//! pub/sub subscribers, and the cache entry shape the Hybrid Cache moves
//! around. Kept deliberately flat and strongly typed — nothing here reads
//! a nested map at runtime.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(HotelId);
opaque_id!(RoomId);
opaque_id!(UserId);
opaque_id!(BookingId);
opaque_id!(CampaignId);

/// Room category. Capacity is derived, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Simple,
    Double,
    DoubleConfort,
    Suite,
}

impl RoomType {
    pub const ALL: [RoomType; 4] = [
        RoomType::Simple,
        RoomType::Double,
        RoomType::DoubleConfort,
        RoomType::Suite,
    ];

    /// `(adults, children)` capacity derived from the room type.
    pub fn capacity(self) -> (u8, u8) {
        match self {
            RoomType::Simple => (1, 0),
            RoomType::Double => (2, 0),
            RoomType::DoubleConfort => (2, 1),
            RoomType::Suite => (2, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    OutOfOrder,
    Cleaning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    AutoApproved,
}

impl ApprovalStatus {
    /// Only these statuses may be handed back to a caller as a live price.
    pub fn servable(self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::AutoApproved)
    }
}

/// Min/max bound a price may move within, and how fast it may move per day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceConstraints {
    pub min_price: f64,
    pub max_price: f64,
    pub max_daily_price_change_pct: f64,
}

/// A currently-quoted dynamic price for a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicPrice {
    pub price: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub approval_status: ApprovalStatus,
}

impl DynamicPrice {
    /// True iff `at` falls in the validity window and the price has cleared approval.
    pub fn is_live(&self, at: DateTime<Utc>) -> bool {
        self.approval_status.servable() && at >= self.valid_from && at <= self.valid_until
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldSuggestion {
    pub suggested_price: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Bounded append list: push drops the oldest entry once `cap` is reached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundedHistory<T> {
    items: Vec<T>,
    cap: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        if self.items.len() > self.cap {
            let excess = self.items.len() - self.cap;
            self.items.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

pub const PRICE_HISTORY_CAP: usize = 365;
pub const YIELD_SUGGESTIONS_CAP: usize = 30;

/// Demand-driven overrides specific to one physical room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomYieldOverride {
    pub enabled: bool,
    pub price_constraints: Option<PriceConstraints>,
    pub view_premium_pct: f64,
    pub floor_premium_pct: f64,
    pub quietness_premium_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub number: String,
    pub floor: i32,
    pub room_type: RoomType,
    pub base_price: f64,
    pub status: RoomStatus,
    pub amenities: Vec<String>,
    pub yield_override: Option<RoomYieldOverride>,
    pub current_dynamic_price: Option<DynamicPrice>,
    #[serde(default = "default_price_history")]
    pub price_history: BoundedHistory<PriceHistoryEntry>,
    #[serde(default = "default_yield_suggestions")]
    pub yield_suggestions: BoundedHistory<YieldSuggestion>,
}

fn default_price_history() -> BoundedHistory<PriceHistoryEntry> {
    BoundedHistory::new(PRICE_HISTORY_CAP)
}

fn default_yield_suggestions() -> BoundedHistory<YieldSuggestion> {
    BoundedHistory::new(YIELD_SUGGESTIONS_CAP)
}

impl Room {
    pub fn capacity(&self) -> (u8, u8) {
        self.room_type.capacity()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrSecurityLevel {
    Low,
    Standard,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrSettings {
    pub enabled: bool,
    pub security_level: QrSecurityLevel,
    pub enabled_for_check_in: bool,
    pub enabled_for_room_service: bool,
    pub enabled_for_payment: bool,
    pub expiry_hours: u32,
    pub requires_geolocation: bool,
    pub geo_radius_meters: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStrategy {
    Aggressive,
    Balanced,
    Conservative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationStrategy {
    Immediate,
    Delayed,
    Scheduled,
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    Availability,
    Pricing,
    Demand,
    Occupancy,
    HotelData,
}

impl CacheCategory {
    /// Default warming priority, lower runs first.
    pub fn warming_priority(self) -> u8 {
        match self {
            CacheCategory::Availability => 1,
            CacheCategory::Pricing => 2,
            CacheCategory::Demand => 3,
            CacheCategory::HotelData => 4,
            CacheCategory::Occupancy => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub strategy: CacheStrategy,
    pub custom_ttl_secs: std::collections::HashMap<String, u64>,
    pub invalidation_strategy: InvalidationStrategy,
    pub delayed_invalidation_ms: u64,
    pub compression_threshold_bytes: usize,
    pub compression_algorithm: CompressionAlgorithm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    Gzip,
    Deflate,
    Brotli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldManagementConfig {
    pub enabled: bool,
    pub base_pricing: std::collections::HashMap<RoomType, f64>,
    pub price_constraints: std::collections::HashMap<RoomType, PriceConstraints>,
    pub occupancy_thresholds: std::collections::HashMap<DemandLevel, f64>,
    pub day_of_week_multipliers: [f64; 7],
    pub lead_time_pricing: Vec<LeadTimeBand>,
    pub length_of_stay_discounts: Vec<LengthOfStayBand>,
    pub event_pricing: Vec<EventPricingWindow>,
    #[serde(default)]
    pub seasonal_pricing: Vec<SeasonalWindow>,
    pub revenue_targets: std::collections::HashMap<String, f64>,
}

/// Per-hotel override of the default month-bucket seasonal multiplier,
/// consulted by the Pricing Engine before falling back to the default table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeadTimeBand {
    pub min_days: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LengthOfStayBand {
    pub min_nights: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPricingWindow {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetricsSnapshot {
    pub cache_hit_rate_by_category: std::collections::HashMap<String, f64>,
    pub qr_usage_count: u64,
    pub qr_success_rate: f64,
    pub health_status: Option<HealthStatus>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub snapshot_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub code: String,
    pub stars: u8,
    pub coordinates: Option<Coordinates>,
    pub timezone: String,
    pub qr_settings: QrSettings,
    pub cache_settings: CacheSettings,
    pub yield_management: YieldManagementConfig,
    pub performance_metrics: PerformanceMetricsSnapshot,
}

impl Hotel {
    /// `qrSettings.enabled` implies at least one enabled QR type and, if
    /// geolocation is required, hotel coordinates are present.
    pub fn qr_settings_valid(&self) -> bool {
        if !self.qr_settings.enabled {
            return true;
        }
        let any_type = self.qr_settings.enabled_for_check_in
            || self.qr_settings.enabled_for_room_service
            || self.qr_settings.enabled_for_payment;
        let geo_ok = !self.qr_settings.requires_geolocation || self.coordinates.is_some();
        any_type && geo_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookingLine {
    pub room_type: RoomType,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub hotel_id: HotelId,
    pub user_id: UserId,
    pub rooms: Vec<BookingLine>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    pub total_price: f64,
}

impl Booking {
    /// `bookingIn < checkOut AND bookingOut > checkIn`.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && self.check_out > check_in
    }

    pub fn is_active_for_inventory(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Receptionist,
    Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub user_id: UserId,
    pub session_id: String,
    pub role: Role,
    pub hotel_id: Option<HotelId>,
    pub rooms: std::collections::HashSet<String>,
    pub loyalty_tier: Option<crate::loyalty::LoyaltyTier>,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub compressed: bool,
}

impl CacheEntry {
    pub fn is_live(&self, at: DateTime<Utc>) -> bool {
        at < self.expires_at
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemandSample {
    pub bookings_count: i64,
    pub last_updated: DateTime<Utc>,
}

impl DemandSample {
    pub fn level(self, capacity: u32, thresholds: &DemandThresholds) -> DemandLevel {
        if capacity == 0 {
            return DemandLevel::VeryLow;
        }
        let ratio = (self.bookings_count.max(0) as f64) / (capacity as f64);
        thresholds.level_for(ratio)
    }
}

/// Ratio → level lookup, lowest bound that the ratio clears wins (highest applicable tier).
#[derive(Debug, Clone, Copy)]
pub struct DemandThresholds {
    pub very_low: f64,
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
    pub very_high: f64,
}

impl Default for DemandThresholds {
    fn default() -> Self {
        Self {
            very_low: 0.0,
            low: 0.3,
            moderate: 0.5,
            high: 0.7,
            very_high: 0.9,
        }
    }
}

impl DemandThresholds {
    pub fn level_for(&self, ratio: f64) -> DemandLevel {
        if ratio >= 1.0 {
            DemandLevel::Critical
        } else if ratio >= self.very_high {
            DemandLevel::VeryHigh
        } else if ratio >= self.high {
            DemandLevel::High
        } else if ratio >= self.moderate {
            DemandLevel::Moderate
        } else if ratio >= self.low {
            DemandLevel::Low
        } else {
            DemandLevel::VeryLow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_type_capacity_matches_table() {
        assert_eq!(RoomType::Simple.capacity(), (1, 0));
        assert_eq!(RoomType::Suite.capacity(), (2, 2));
    }

    #[test]
    fn bounded_history_drops_oldest() {
        let mut h: BoundedHistory<u32> = BoundedHistory::new(3);
        for i in 0..5 {
            h.push(i);
        }
        let items: Vec<_> = h.iter().copied().collect();
        assert_eq!(items, vec![2, 3, 4]);
    }

    #[test]
    fn booking_overlap_predicate() {
        let b = Booking {
            id: BookingId::from("b1"),
            hotel_id: HotelId::from("h1"),
            user_id: UserId::from("u1"),
            rooms: vec![],
            check_in: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(),
            status: BookingStatus::Confirmed,
            total_price: 200.0,
        };
        assert!(b.overlaps(
            NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 13).unwrap()
        ));
        assert!(!b.overlaps(
            NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
        ));
    }

    #[test]
    fn demand_thresholds_map_ratio_to_level() {
        let t = DemandThresholds::default();
        assert_eq!(t.level_for(0.0), DemandLevel::VeryLow);
        assert_eq!(t.level_for(0.72), DemandLevel::High);
        assert_eq!(t.level_for(1.0), DemandLevel::Critical);
    }

    #[test]
    fn zero_capacity_demand_is_very_low() {
        let sample = DemandSample {
            bookings_count: 5,
            last_updated: Utc::now(),
        };
        assert_eq!(sample.level(0, &DemandThresholds::default()), DemandLevel::VeryLow);
    }
}
