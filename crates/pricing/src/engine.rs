//! Pricing Engine — pure function over a multiplicative/additive factor
//! stack for `(hotel, roomType, checkIn)`. Stateless; every read/write of
//! a derived price goes through the caller's `HybridCache` under `price:`
//! keys, not through this struct.

use crate::demand::DemandTracker;
use crate::providers::{CompetitorProvider, CurrencyProvider};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use hotel_core::error::{HotelError, HotelResult};
use hotel_core::loyalty::LoyaltyTier;
use hotel_core::types::{ApprovalStatus, DemandLevel, Hotel, PriceConstraints, Room, RoomType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PricingRequest {
    pub room_type: RoomType,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: u32,
    pub advance_days: i64,
    pub loyalty_tier: Option<LoyaltyTier>,
    pub promo_code: Option<String>,
    pub currency: String,
    /// Booked / total capacity over the calendar week containing `check_in`,
    /// computed by the caller (Availability Service owns the weekly window).
    pub weekly_occupancy_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingQuote {
    pub base_price: f64,
    pub final_price: f64,
    pub factors: Vec<(&'static str, f64)>,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub savings: f64,
    pub price_increase: f64,
    pub approval_status: ApprovalStatus,
    pub conversion_error: bool,
}

const EUR: &str = "EUR";

fn demand_multiplier(level: DemandLevel) -> f64 {
    match level {
        DemandLevel::VeryLow => 0.7,
        DemandLevel::Low => 0.85,
        DemandLevel::Moderate => 1.0,
        DemandLevel::High => 1.15,
        DemandLevel::VeryHigh => 1.3,
        DemandLevel::Critical => 1.5,
    }
}

/// Default month-bucket table, used when no per-hotel `seasonalPricing`
/// window covers the date.
fn default_seasonal_multiplier(date: NaiveDate) -> f64 {
    match date.month() {
        12 | 1 | 2 => 1.3,
        6 | 7 | 8 => 1.6,
        3..=5 | 9..=11 => 1.0,
        _ => 0.8,
    }
}

fn seasonal_multiplier(hotel: &Hotel, date: NaiveDate) -> f64 {
    hotel
        .yield_management
        .seasonal_pricing
        .iter()
        .find(|w| date >= w.start && date <= w.end)
        .map(|w| w.multiplier)
        .unwrap_or_else(|| default_seasonal_multiplier(date))
}

fn default_day_of_week_multipliers() -> [f64; 7] {
    // Mon, Tue, Wed, Thu, Fri, Sat, Sun
    [0.85, 0.85, 0.9, 0.95, 1.15, 1.25, 0.9]
}

fn day_of_week_multiplier(hotel: &Hotel, date: NaiveDate) -> f64 {
    let idx = date.weekday().num_days_from_monday() as usize;
    hotel
        .yield_management
        .day_of_week_multipliers
        .get(idx)
        .copied()
        .filter(|m| *m > 0.0)
        .unwrap_or_else(|| default_day_of_week_multipliers()[idx])
}

fn weekly_occupancy_multiplier(ratio: f64) -> f64 {
    if ratio >= 0.9 {
        1.3
    } else if ratio >= 0.7 {
        1.1
    } else if ratio <= 0.3 {
        0.9
    } else {
        1.0
    }
}

fn competitor_multiplier(our_price: f64, avg_price: f64) -> f64 {
    if avg_price <= 0.0 {
        return 1.0;
    }
    let ratio = our_price / avg_price;
    if ratio > 1.2 {
        0.95
    } else if ratio < 0.8 {
        1.05
    } else {
        1.0
    }
}

fn event_multiplier(hotel: &Hotel, date: NaiveDate) -> f64 {
    hotel
        .yield_management
        .event_pricing
        .iter()
        .find(|w| date >= w.start && date <= w.end)
        .map(|w| w.multiplier.clamp(1.0, 5.0))
        .unwrap_or(1.0)
}

/// `AdvanceBooking` tiers: mutually exclusive, highest qualifying wins.
fn advance_booking_multiplier(advance_days: i64) -> f64 {
    if advance_days >= 90 {
        0.8
    } else if advance_days >= 60 {
        0.85
    } else if advance_days >= 30 {
        0.9
    } else if advance_days >= 7 {
        0.95
    } else if advance_days <= 1 {
        1.1
    } else {
        1.0
    }
}

fn length_of_stay_multiplier(nights: i64) -> f64 {
    if nights >= 14 {
        0.8
    } else if nights >= 7 {
        0.85
    } else if nights >= 4 {
        0.9
    } else if nights >= 2 {
        0.95
    } else {
        1.0
    }
}

/// Stacks with `advance_booking_multiplier` by design, not a bug: both
/// factors apply to the same quote rather than one suppressing the other.
fn last_minute_multiplier(advance_days: i64) -> f64 {
    if advance_days == 0 {
        1.2
    } else if advance_days <= 3 {
        1.1
    } else {
        1.0
    }
}

fn resolve_promo(code: &str) -> Option<f64> {
    match code {
        "EARLY20" => Some(0.8),
        "LOYAL10" => Some(0.9),
        _ => None,
    }
}

pub struct PricingEngine {
    demand: Arc<DemandTracker>,
    currency: Arc<dyn CurrencyProvider>,
    competitor: Arc<dyn CompetitorProvider>,
    valid_window: chrono::Duration,
    min_price_floor_pct: f64,
    default_max_daily_change_pct: f64,
}

impl PricingEngine {
    pub fn new(
        demand: Arc<DemandTracker>,
        currency: Arc<dyn CurrencyProvider>,
        competitor: Arc<dyn CompetitorProvider>,
        valid_window_minutes: i64,
        min_price_floor_pct: f64,
        default_max_daily_change_pct: f64,
    ) -> Self {
        Self {
            demand,
            currency,
            competitor,
            valid_window: chrono::Duration::minutes(valid_window_minutes),
            min_price_floor_pct,
            default_max_daily_change_pct,
        }
    }

    /// Exposed so the Availability Service can read demand levels for an
    /// `AvailabilityView` without reaching around this engine into the tracker.
    pub async fn demand_level(
        &self,
        hotel_id: &hotel_core::types::HotelId,
        room_type: RoomType,
        date: NaiveDate,
    ) -> HotelResult<DemandLevel> {
        self.demand.level(hotel_id, room_type, date).await
    }

    /// Converts an amount cached in the canonical `EUR` currency into
    /// `target_currency`, used by the Availability Service so a cached
    /// availability view can be re-priced per request regardless of which
    /// currency populated the cache. Returns the original amount and
    /// `conversion_error=true` when the provider fails, mirroring `quote`'s
    /// own degrade-on-failure behavior.
    pub async fn convert_from_eur(&self, amount_eur: f64, target_currency: &str) -> (f64, bool) {
        if target_currency == EUR {
            return (amount_eur, false);
        }
        match self.currency.convert(amount_eur, EUR, target_currency).await {
            Ok(converted) => (converted.amount, false),
            Err(e) => {
                warn!(error = %e, "currency conversion failed, returning EUR");
                (amount_eur, true)
            }
        }
    }

    /// Exposed so the Availability Service can feed booking deltas into the
    /// Demand Tracker on `onBookingChanged` without a second shared handle.
    pub async fn record_demand(
        &self,
        hotel_id: &hotel_core::types::HotelId,
        room_type: RoomType,
        date: NaiveDate,
        delta: i64,
        now: DateTime<Utc>,
    ) -> HotelResult<()> {
        self.demand.record(hotel_id, room_type, date, delta, now).await
    }

    pub async fn quote(
        &self,
        hotel: &Hotel,
        room: &Room,
        req: PricingRequest,
        now: DateTime<Utc>,
    ) -> HotelResult<PricingQuote> {
        if req.check_out <= req.check_in {
            return Err(HotelError::Validation("checkOut must be after checkIn".into()));
        }

        let base_price = if room.base_price > 0.0 {
            room.base_price
        } else {
            hotel
                .yield_management
                .base_pricing
                .get(&req.room_type)
                .copied()
                .unwrap_or(0.0)
        };
        if base_price <= 0.0 {
            return Err(HotelError::Pricing("no positive base price available".into()));
        }

        let mut factors: Vec<(&'static str, f64)> = Vec::with_capacity(8);

        let demand_level = self
            .demand
            .level(&hotel.id, req.room_type, req.check_in)
            .await
            .unwrap_or(DemandLevel::Moderate);
        factors.push(("demand", demand_multiplier(demand_level)));
        factors.push(("seasonal", seasonal_multiplier(hotel, req.check_in)));
        factors.push(("dayOfWeek", day_of_week_multiplier(hotel, req.check_in)));
        factors.push(("weeklyOccupancy", weekly_occupancy_multiplier(req.weekly_occupancy_ratio)));

        match self.competitor.fetch(&hotel.id).await {
            Ok(Some(snapshot)) => {
                factors.push(("competitor", competitor_multiplier(snapshot.our_price, snapshot.avg_price)));
            }
            Ok(None) => {
                debug!(hotel = %hotel.id, "no competitor snapshot available, skipping factor");
            }
            Err(e) => {
                warn!(hotel = %hotel.id, error = %e, "competitor provider unavailable, skipping factor");
            }
        }

        let loyalty_multiplier = req
            .loyalty_tier
            .map(LoyaltyTier::pricing_discount_multiplier)
            .unwrap_or(1.0);
        factors.push(("loyalty", loyalty_multiplier));
        factors.push(("event", event_multiplier(hotel, req.check_in)));

        let advance_days = req.advance_days.max(0);
        let nights = (req.check_out - req.check_in).num_days().max(1);
        factors.push(("advanceBooking", advance_booking_multiplier(advance_days)));
        factors.push(("lengthOfStay", length_of_stay_multiplier(nights)));
        factors.push(("lastMinute", last_minute_multiplier(advance_days)));

        let mut final_price = base_price;
        for (name, factor) in &factors {
            if !factor.is_finite() || *factor < 0.0 {
                return Err(HotelError::Pricing(format!("factor {name} produced an invalid multiplier")));
            }
            final_price *= factor;
        }

        if let Some(code) = &req.promo_code {
            if let Some(promo_factor) = resolve_promo(code) {
                final_price *= promo_factor;
                factors.push(("promo", promo_factor));
            }
        }

        if !final_price.is_finite() || final_price < 0.0 {
            return Err(HotelError::Pricing("computed price is not a finite positive number".into()));
        }

        final_price = final_price.max(base_price * self.min_price_floor_pct);

        let constraints = room_price_constraints(room);
        if let Some(c) = constraints {
            final_price = final_price.clamp(c.min_price, c.max_price);
        }

        let max_daily_change_pct = constraints
            .map(|c| c.max_daily_price_change_pct)
            .unwrap_or(self.default_max_daily_change_pct);
        let mut approval_status = ApprovalStatus::AutoApproved;
        if let Some(previous) = room
            .current_dynamic_price
            .as_ref()
            .filter(|p| p.is_live(now))
        {
            if previous.price > 0.0 {
                let delta_pct = (final_price - previous.price).abs() / previous.price;
                if delta_pct > max_daily_change_pct {
                    approval_status = ApprovalStatus::Pending;
                }
            }
        }

        let mut currency = EUR.to_string();
        let mut conversion_error = false;
        if req.currency != EUR {
            match self.currency.convert(final_price, EUR, &req.currency).await {
                Ok(converted) => {
                    final_price = converted.amount;
                    currency = req.currency.clone();
                }
                Err(e) => {
                    warn!(error = %e, "currency conversion failed, returning EUR");
                    conversion_error = true;
                }
            }
        }

        let savings = (base_price - final_price).max(0.0);
        let price_increase = (final_price - base_price).max(0.0);

        Ok(PricingQuote {
            base_price,
            final_price,
            factors,
            currency,
            valid_from: now,
            valid_until: now + self.valid_window,
            savings,
            price_increase,
            approval_status,
            conversion_error,
        })
    }
}

fn room_price_constraints(room: &Room) -> Option<&PriceConstraints> {
    room.yield_override.as_ref()?.price_constraints.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandRecompute;
    use crate::providers::{CompetitorSnapshot, NoopCurrencyProvider, UnavailableCompetitorProvider};
    use async_trait::async_trait;
    use hotel_cache::hybrid::HybridCache;
    use hotel_cache::kv::KvCacheDriver;
    use hotel_core::clock::SystemClock;
    use hotel_core::types::*;
    use std::time::Duration as StdDuration;

    struct FakeRecompute(i64, u32);
    #[async_trait]
    impl DemandRecompute for FakeRecompute {
        async fn recompute(&self, _: &HotelId, _: RoomType, _: NaiveDate) -> HotelResult<i64> {
            Ok(self.0)
        }
        async fn capacity(&self, _: &HotelId, _: RoomType) -> HotelResult<u32> {
            Ok(self.1)
        }
    }

    struct MemKv(dashmap::DashMap<String, Vec<u8>>);
    #[async_trait]
    impl KvCacheDriver for MemKv {
        async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>> {
            Ok(self.0.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: Vec<u8>, _ttl: StdDuration) -> HotelResult<()> {
            self.0.insert(key.to_string(), value);
            Ok(())
        }
        async fn del(&self, key: &str) -> HotelResult<()> {
            self.0.remove(key);
            Ok(())
        }
        async fn tag(&self, _tag: &str, _key: &str) -> HotelResult<()> {
            Ok(())
        }
        async fn tag_members(&self, _tag: &str) -> HotelResult<Vec<String>> {
            Ok(vec![])
        }
        async fn ping(&self) -> HotelResult<()> {
            Ok(())
        }
    }

    fn sample_hotel() -> Hotel {
        Hotel {
            id: HotelId::from("h1"),
            code: "H1".into(),
            stars: 4,
            coordinates: None,
            timezone: "UTC".into(),
            qr_settings: QrSettings {
                enabled: false,
                security_level: QrSecurityLevel::Standard,
                enabled_for_check_in: false,
                enabled_for_room_service: false,
                enabled_for_payment: false,
                expiry_hours: 24,
                requires_geolocation: false,
                geo_radius_meters: None,
            },
            cache_settings: CacheSettings {
                strategy: CacheStrategy::Balanced,
                custom_ttl_secs: Default::default(),
                invalidation_strategy: InvalidationStrategy::Smart,
                delayed_invalidation_ms: 5000,
                compression_threshold_bytes: 1024,
                compression_algorithm: CompressionAlgorithm::Gzip,
            },
            yield_management: YieldManagementConfig {
                enabled: true,
                base_pricing: Default::default(),
                price_constraints: Default::default(),
                occupancy_thresholds: Default::default(),
                day_of_week_multipliers: default_day_of_week_multipliers(),
                lead_time_pricing: vec![],
                length_of_stay_discounts: vec![],
                event_pricing: vec![],
                seasonal_pricing: vec![],
                revenue_targets: Default::default(),
            },
            performance_metrics: Default::default(),
        }
    }

    fn sample_room(base_price: f64) -> Room {
        Room {
            id: RoomId::from("r1"),
            hotel_id: HotelId::from("h1"),
            number: "101".into(),
            floor: 1,
            room_type: RoomType::Simple,
            base_price,
            status: RoomStatus::Available,
            amenities: vec![],
            yield_override: None,
            current_dynamic_price: None,
            price_history: Default::default(),
            yield_suggestions: Default::default(),
        }
    }

    fn engine(demand_count: i64, capacity: u32) -> PricingEngine {
        let cache = Arc::new(HybridCache::new(Arc::new(MemKv(dashmap::DashMap::new())), 1000, Arc::new(SystemClock)));
        let demand = Arc::new(DemandTracker::new(cache, Arc::new(FakeRecompute(demand_count, capacity))));
        PricingEngine::new(
            demand,
            Arc::new(NoopCurrencyProvider),
            Arc::new(UnavailableCompetitorProvider),
            30,
            0.5,
            0.2,
        )
    }

    #[tokio::test]
    async fn saturday_high_demand_summer_matches_documented_factor_stack() {
        let engine = engine(72, 100);
        let hotel = sample_hotel();
        let room = sample_room(100.0);
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap(); // Saturday
        let req = PricingRequest {
            room_type: RoomType::Simple,
            check_in,
            check_out: check_in + chrono::Duration::days(1),
            guest_count: 2,
            advance_days: 10, // outside both advance and last-minute bands
            loyalty_tier: None,
            promo_code: None,
            currency: "EUR".into(),
            weekly_occupancy_ratio: 0.5,
        };
        let quote = engine.quote(&hotel, &room, req, Utc::now()).await.unwrap();
        // demand(High=1.15) * seasonal(summer=1.6) * dayOfWeek(Sat=1.25) * weekly(1.0)
        //   * loyalty(1.0) * event(1.0) * advance(1.0) * los(1.0) * lastMinute(1.0)
        let expected = 100.0 * 1.15 * 1.6 * 1.25;
        assert!((quote.final_price - expected).abs() < 1e-6, "{}", quote.final_price);
        assert_eq!(quote.approval_status, ApprovalStatus::AutoApproved);
    }

    #[tokio::test]
    async fn last_minute_and_advance_booking_intentionally_stack() {
        let engine = engine(0, 10);
        let hotel = sample_hotel();
        let room = sample_room(100.0);
        let check_in = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(); // Monday, shoulder season
        let req = PricingRequest {
            room_type: RoomType::Simple,
            check_in,
            check_out: check_in + chrono::Duration::days(1),
            guest_count: 1,
            advance_days: 1,
            loyalty_tier: None,
            promo_code: None,
            currency: "EUR".into(),
            weekly_occupancy_ratio: 0.5,
        };
        let quote = engine.quote(&hotel, &room, req, Utc::now()).await.unwrap();
        // advanceBooking(<=1d => 1.1) AND lastMinute(<=3d => 1.1) both apply.
        let advance = quote.factors.iter().find(|(n, _)| *n == "advanceBooking").unwrap().1;
        let last_minute = quote.factors.iter().find(|(n, _)| *n == "lastMinute").unwrap().1;
        assert_eq!(advance, 1.1);
        assert_eq!(last_minute, 1.1);
    }

    #[tokio::test]
    async fn price_floor_clamps_aggressive_discounts() {
        let engine = engine(0, 10); // demand very low
        let hotel = sample_hotel();
        let room = sample_room(100.0);
        let check_in = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(); // Monday, shoulder
        let req = PricingRequest {
            room_type: RoomType::Simple,
            check_in,
            check_out: check_in + chrono::Duration::days(20),
            guest_count: 1,
            advance_days: 120,
            loyalty_tier: Some(LoyaltyTier::Diamond),
            promo_code: Some("EARLY20".into()),
            currency: "EUR".into(),
            weekly_occupancy_ratio: 0.1,
        };
        let quote = engine.quote(&hotel, &room, req, Utc::now()).await.unwrap();
        assert!(quote.final_price >= 50.0 - 1e-6);
    }

    #[tokio::test]
    async fn daily_change_beyond_threshold_is_pending() {
        let engine = engine(72, 100);
        let hotel = sample_hotel();
        let mut room = sample_room(100.0);
        let now = Utc::now();
        room.current_dynamic_price = Some(DynamicPrice {
            price: 100.0,
            valid_from: now - chrono::Duration::minutes(5),
            valid_until: now + chrono::Duration::minutes(25),
            approval_status: ApprovalStatus::AutoApproved,
        });
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let req = PricingRequest {
            room_type: RoomType::Simple,
            check_in,
            check_out: check_in + chrono::Duration::days(1),
            guest_count: 1,
            advance_days: 10,
            loyalty_tier: None,
            promo_code: None,
            currency: "EUR".into(),
            weekly_occupancy_ratio: 0.5,
        };
        let quote = engine.quote(&hotel, &room, req, now).await.unwrap();
        assert_eq!(quote.approval_status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn zero_base_price_is_a_pricing_error() {
        let engine = engine(0, 10);
        let hotel = sample_hotel();
        let room = sample_room(0.0);
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let req = PricingRequest {
            room_type: RoomType::Simple,
            check_in,
            check_out: check_in + chrono::Duration::days(1),
            guest_count: 1,
            advance_days: 10,
            loyalty_tier: None,
            promo_code: None,
            currency: "EUR".into(),
            weekly_occupancy_ratio: 0.5,
        };
        let err = engine.quote(&hotel, &room, req, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), hotel_core::error::ErrorKind::Pricing);
    }
}
