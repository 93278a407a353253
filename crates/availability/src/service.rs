//! Availability Service: "what is available at hotel H for [checkIn,
//! checkOut] by roomType?", kept fresh across booking mutations via cache
//! invalidation, demand updates, and pub/sub broadcast.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use hotel_cache::hybrid::{CacheTuning, HybridCache};
use hotel_core::error::{HotelError, HotelResult};
use hotel_core::event_bus::{DomainEvent, EventSink};
use hotel_core::types::{
    CacheCategory, CacheSettings, DemandLevel, HotelId, InvalidationStrategy, RoomStatus, RoomType,
};
use hotel_pricing::demand::DemandRecompute;
use hotel_pricing::engine::{PricingEngine, PricingRequest};
use hotel_store::StoreGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingAction {
    Book,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTypeAvailability {
    pub room_type: RoomType,
    pub total_rooms: u32,
    pub available_rooms: u32,
    pub base_price: f64,
    pub current_price: f64,
    pub demand_level: DemandLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub hotel_id: HotelId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub currency: String,
    pub room_types: Vec<RoomTypeAvailability>,
    pub occupancy_rate: f64,
    pub from_cache: bool,
    pub computed_at: DateTime<Utc>,
}

fn avail_key(hotel_id: &HotelId, check_in: NaiveDate, check_out: NaiveDate) -> String {
    format!("avail:{hotel_id}:{check_in}:{check_out}")
}

fn occupancy_key(hotel_id: &HotelId, date: NaiveDate) -> String {
    format!("occupancy:{hotel_id}:{date}")
}

/// Serialized cache payload; kept separate from [`AvailabilityView`] so a
/// currency conversion on read never mutates the cached record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAvailability {
    hotel_id: HotelId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    room_types: Vec<RoomTypeAvailability>,
    occupancy_rate: f64,
    computed_at: DateTime<Utc>,
}

pub struct AvailabilityService {
    store: Arc<dyn StoreGateway>,
    cache: Arc<HybridCache>,
    pricing: Arc<PricingEngine>,
    events: Arc<dyn EventSink>,
    /// Per-(hotel, date-range) serialization: covers recompute + cache write
    /// + broadcast enqueue so readers never observe a half-applied update.
    locks: Arc<DashMap<String, Arc<AsyncMutex<()>>>>,
    default_ttl_secs: u64,
    occupancy_ttl_secs: u64,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        cache: Arc<HybridCache>,
        pricing: Arc<PricingEngine>,
        events: Arc<dyn EventSink>,
        default_ttl_secs: u64,
        occupancy_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            cache,
            pricing,
            events,
            locks: Arc::new(DashMap::new()),
            default_ttl_secs,
            occupancy_ttl_secs,
        }
    }

    fn lock_for(&self, hotel_id: &HotelId) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.locks
                .entry(hotel_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    pub async fn get_availability(
        &self,
        hotel_id: &HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        currency: &str,
        now: DateTime<Utc>,
    ) -> HotelResult<AvailabilityView> {
        if check_in == check_out {
            return Ok(AvailabilityView {
                hotel_id: hotel_id.clone(),
                check_in,
                check_out,
                currency: currency.to_string(),
                room_types: vec![],
                occupancy_rate: 0.0,
                from_cache: false,
                computed_at: now,
            });
        }
        if check_out < check_in {
            return Err(HotelError::Validation("checkOut must not precede checkIn".into()));
        }

        let key = avail_key(hotel_id, check_in, check_out);
        if let Some(raw) = self.cache.get(&key, CacheCategory::Availability).await? {
            if let Ok(cached) = serde_json::from_slice::<CachedAvailability>(&raw) {
                return self.view_in_currency(cached, currency, true).await;
            }
        }

        let lock = self.lock_for(hotel_id);
        let _guard = lock.lock().await;

        // Single-flight: a concurrent caller may have populated the cache
        // while we waited for the lock, so recheck before recomputing.
        if let Some(raw) = self.cache.get(&key, CacheCategory::Availability).await? {
            if let Ok(cached) = serde_json::from_slice::<CachedAvailability>(&raw) {
                return self.view_in_currency(cached, currency, true).await;
            }
        }

        let cached = self.recompute_and_cache(hotel_id, check_in, check_out, now).await?;
        self.view_in_currency(cached, currency, false).await
    }

    /// Prices are cached in the canonical `EUR` currency under a
    /// currency-agnostic key (`avail:{hotel}:{in}:{out}`), so every read —
    /// cache hit or miss alike — converts into the requested currency here
    /// rather than trusting whichever currency happened to populate the
    /// cache first.
    async fn view_in_currency(
        &self,
        cached: CachedAvailability,
        currency: &str,
        from_cache: bool,
    ) -> HotelResult<AvailabilityView> {
        let mut room_types = cached.room_types;
        for room_type in &mut room_types {
            let (base_price, _) = self.pricing.convert_from_eur(room_type.base_price, currency).await;
            let (current_price, _) = self.pricing.convert_from_eur(room_type.current_price, currency).await;
            room_type.base_price = base_price;
            room_type.current_price = current_price;
        }
        Ok(AvailabilityView {
            hotel_id: cached.hotel_id,
            check_in: cached.check_in,
            check_out: cached.check_out,
            currency: currency.to_string(),
            room_types,
            occupancy_rate: cached.occupancy_rate,
            from_cache,
            computed_at: cached.computed_at,
        })
    }

    /// Precomputes and populates availability for the next `horizon_days`
    /// one-night windows, respecting `CacheCategory::warming_priority`
    /// ordering implicitly by warming availability (and, via
    /// `recompute_and_cache`, pricing) first. Used by the cache-warming
    /// background worker and the `cache warm` operator command.
    pub async fn warm(&self, hotel_id: &HotelId, horizon_days: i64, now: DateTime<Utc>) -> HotelResult<u32> {
        let start = now.date_naive();
        let mut warmed = 0u32;
        for offset in 0..horizon_days.max(0) {
            let check_in = start + chrono::Duration::days(offset);
            let check_out = check_in + chrono::Duration::days(1);
            let lock = self.lock_for(hotel_id);
            let _guard = lock.lock().await;
            self.recompute_and_cache(hotel_id, check_in, check_out, now).await?;
            warmed += 1;
        }
        Ok(warmed)
    }

    /// Recomputes the canonical view and writes it to cache in `EUR` —
    /// the cache key carries no currency, so a single canonical currency is
    /// the only way two callers requesting different currencies observe a
    /// consistent cached price. Callers convert to their requested currency
    /// via [`Self::view_in_currency`].
    async fn recompute_and_cache(
        &self,
        hotel_id: &HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        now: DateTime<Utc>,
    ) -> HotelResult<CachedAvailability> {
        let hotel = self.store.get_hotel(hotel_id).await?;
        let rooms = self.store.get_rooms_for_hotel(hotel_id).await?;
        let bookings = self
            .store
            .get_overlapping_bookings(hotel_id, check_in, check_out)
            .await?;

        let nights = (check_out - check_in).num_days().max(1);
        let mut room_types = Vec::with_capacity(RoomType::ALL.len());
        let mut total_all = 0u32;
        let mut avail_all = 0u32;

        for room_type in RoomType::ALL {
            let total_rooms = rooms
                .iter()
                .filter(|r| r.room_type == room_type && r.status == RoomStatus::Available)
                .count() as u32;
            let booked_rooms: u32 = bookings
                .iter()
                .filter(|b| b.is_active_for_inventory())
                .flat_map(|b| b.rooms.iter())
                .filter(|line| line.room_type == room_type)
                .map(|line| line.quantity)
                .sum();
            let available_rooms = total_rooms.saturating_sub(booked_rooms);

            let weekly_occupancy_ratio = if total_rooms == 0 {
                0.0
            } else {
                (booked_rooms as f64 / total_rooms as f64).min(1.0)
            };

            let room = rooms.iter().find(|r| r.room_type == room_type);
            let quote = if let Some(room) = room {
                let req = PricingRequest {
                    room_type,
                    check_in,
                    check_out,
                    guest_count: 1,
                    advance_days: (check_in - now.date_naive()).num_days().max(0),
                    loyalty_tier: None,
                    promo_code: None,
                    currency: "EUR".to_string(),
                    weekly_occupancy_ratio,
                };
                self.pricing.quote(&hotel, room, req, now).await.ok()
            } else {
                None
            };

            let demand_level = self
                .pricing
                .demand_level(hotel_id, room_type, check_in)
                .await
                .unwrap_or(DemandLevel::Moderate);

            room_types.push(RoomTypeAvailability {
                room_type,
                total_rooms,
                available_rooms,
                base_price: quote.as_ref().map(|q| q.base_price).unwrap_or(0.0),
                current_price: quote.as_ref().map(|q| q.final_price).unwrap_or(0.0),
                demand_level,
            });

            total_all += total_rooms * nights as u32;
            avail_all += available_rooms * nights as u32;
        }

        let occupancy_rate = if total_all == 0 {
            0.0
        } else {
            1.0 - (avail_all as f64 / total_all as f64)
        };

        let cached = CachedAvailability {
            hotel_id: hotel_id.clone(),
            check_in,
            check_out,
            room_types,
            occupancy_rate,
            computed_at: now,
        };
        let bytes = serde_json::to_vec(&cached)?;
        let key = avail_key(hotel_id, check_in, check_out);
        self.cache
            .set(
                &key,
                bytes,
                CacheCategory::Availability,
                vec![format!("avail:{hotel_id}")],
                std::time::Duration::from_secs(self.default_ttl_secs),
                tuning_for(&hotel.cache_settings),
            )
            .await?;

        self.events.emit(DomainEvent::AvailabilityUpdate {
            hotel_id: hotel_id.clone(),
            check_in,
            check_out,
            emitted_at: now,
        });

        Ok(cached)
    }

    pub async fn on_booking_changed(
        &self,
        hotel_id: &HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        lines: &[(RoomType, u32)],
        action: BookingAction,
        now: DateTime<Utc>,
    ) -> HotelResult<()> {
        let lock = self.lock_for(hotel_id);
        let _guard = lock.lock().await;

        let hotel = self.store.get_hotel(hotel_id).await?;
        self.cache
            .invalidate(
                &format!("avail:{hotel_id}"),
                hotel.cache_settings.invalidation_strategy,
                tuning_for(&hotel.cache_settings),
            )
            .await?;
        self.cache
            .invalidate(
                &format!("occupancy:{hotel_id}"),
                hotel.cache_settings.invalidation_strategy,
                tuning_for(&hotel.cache_settings),
            )
            .await?;
        if hotel.cache_settings.strategy != hotel_core::types::CacheStrategy::Conservative {
            self.cache
                .invalidate(
                    &format!("price:{hotel_id}"),
                    hotel.cache_settings.invalidation_strategy,
                    tuning_for(&hotel.cache_settings),
                )
                .await?;
        }

        let sign = match action {
            BookingAction::Book => 1i64,
            BookingAction::Cancel => -1i64,
        };
        let mut date = check_in;
        while date < check_out {
            for (room_type, quantity) in lines {
                self.pricing
                    .record_demand(hotel_id, *room_type, date, sign * (*quantity as i64), now)
                    .await?;
            }
            date = date.succ_opt().unwrap_or(date + chrono::Duration::days(1));
        }

        self.recompute_and_cache(hotel_id, check_in, check_out, now).await?;
        Ok(())
    }

    pub async fn get_real_time_occupancy(&self, hotel_id: &HotelId, now: DateTime<Utc>) -> HotelResult<AvailabilityView> {
        let today = now.date_naive();
        let key = occupancy_key(hotel_id, today);
        if let Some(raw) = self.cache.get(&key, CacheCategory::Occupancy).await? {
            if let Ok(view) = serde_json::from_slice::<AvailabilityView>(&raw) {
                return Ok(view);
            }
        }
        let mut view = self
            .get_availability(hotel_id, today, today + chrono::Duration::days(1), "EUR", now)
            .await?;
        view.from_cache = false;
        let bytes = serde_json::to_vec(&view)?;
        self.cache
            .set(
                &key,
                bytes,
                CacheCategory::Occupancy,
                vec![format!("occupancy:{hotel_id}")],
                std::time::Duration::from_secs(self.occupancy_ttl_secs),
                CacheTuning::default(),
            )
            .await?;
        Ok(view)
    }
}

fn tuning_for(settings: &CacheSettings) -> CacheTuning {
    CacheTuning {
        compression_threshold_bytes: settings.compression_threshold_bytes,
        compression_algorithm: settings.compression_algorithm,
        delayed_invalidation_ms: settings.delayed_invalidation_ms,
    }
}

/// Lazy recount source for [`hotel_pricing::demand::DemandTracker`]: scans
/// the authoritative store's overlapping bookings for (hotel, roomType,
/// date) rather than trusting a possibly-stale counter.
pub struct StoreBackedRecompute {
    store: Arc<dyn StoreGateway>,
}

impl StoreBackedRecompute {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl DemandRecompute for StoreBackedRecompute {
    async fn recompute(&self, hotel_id: &HotelId, room_type: RoomType, date: NaiveDate) -> HotelResult<i64> {
        let bookings = self
            .store
            .get_overlapping_bookings(hotel_id, date, date + chrono::Duration::days(1))
            .await?;
        let count: i64 = bookings
            .iter()
            .filter(|b| b.is_active_for_inventory())
            .flat_map(|b| b.rooms.iter())
            .filter(|line| line.room_type == room_type)
            .map(|line| line.quantity as i64)
            .sum();
        Ok(count)
    }

    async fn capacity(&self, hotel_id: &HotelId, room_type: RoomType) -> HotelResult<u32> {
        let rooms = self.store.get_rooms_for_hotel(hotel_id).await?;
        Ok(rooms
            .iter()
            .filter(|r| r.room_type == room_type && r.status == RoomStatus::Available)
            .count() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_core::clock::SystemClock;
    use hotel_core::event_bus::capture_sink;
    use hotel_core::types::*;
    use hotel_pricing::demand::DemandTracker;
    use hotel_pricing::providers::{NoopCurrencyProvider, UnavailableCompetitorProvider};
    use hotel_store::InMemoryStore;

    fn sample_hotel(id: &str) -> Hotel {
        Hotel {
            id: HotelId::from(id),
            code: id.to_uppercase(),
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
                invalidation_strategy: InvalidationStrategy::Immediate,
                delayed_invalidation_ms: 5000,
                compression_threshold_bytes: 1024,
                compression_algorithm: CompressionAlgorithm::Gzip,
            },
            yield_management: YieldManagementConfig {
                enabled: true,
                base_pricing: Default::default(),
                price_constraints: Default::default(),
                occupancy_thresholds: Default::default(),
                day_of_week_multipliers: [1.0; 7],
                lead_time_pricing: vec![],
                length_of_stay_discounts: vec![],
                event_pricing: vec![],
                seasonal_pricing: vec![],
                revenue_targets: Default::default(),
            },
            performance_metrics: Default::default(),
        }
    }

    fn sample_room(hotel_id: &str, number: &str, room_type: RoomType) -> Room {
        Room {
            id: RoomId::from(format!("{hotel_id}-{number}")),
            hotel_id: HotelId::from(hotel_id),
            number: number.into(),
            floor: 1,
            room_type,
            base_price: 100.0,
            status: RoomStatus::Available,
            amenities: vec![],
            yield_override: None,
            current_dynamic_price: None,
            price_history: BoundedHistory::new(PRICE_HISTORY_CAP),
            yield_suggestions: BoundedHistory::new(YIELD_SUGGESTIONS_CAP),
        }
    }

    struct MemKv(dashmap::DashMap<String, Vec<u8>>);
    #[async_trait::async_trait]
    impl hotel_cache::kv::KvCacheDriver for MemKv {
        async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>> {
            Ok(self.0.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: Vec<u8>, _ttl: std::time::Duration) -> HotelResult<()> {
            self.0.insert(key.to_string(), value);
            Ok(())
        }
        async fn del(&self, key: &str) -> HotelResult<()> {
            self.0.remove(key);
            Ok(())
        }
        async fn tag(&self, tag: &str, key: &str) -> HotelResult<()> {
            self.0.insert(format!("tagset:{tag}:{key}"), vec![]);
            Ok(())
        }
        async fn tag_members(&self, _tag: &str) -> HotelResult<Vec<String>> {
            Ok(vec![])
        }
        async fn ping(&self) -> HotelResult<()> {
            Ok(())
        }
    }

    async fn sample_service() -> (AvailabilityService, Arc<InMemoryStore>, Arc<dyn hotel_core::event_bus::EventSink>) {
        let store = Arc::new(InMemoryStore::new());
        store.put_hotel(sample_hotel("h1")).await.unwrap();
        store.put_room(sample_room("h1", "101", RoomType::Simple)).await.unwrap();
        store.put_room(sample_room("h1", "102", RoomType::Simple)).await.unwrap();

        let cache = Arc::new(HybridCache::new(Arc::new(MemKv(dashmap::DashMap::new())), 1000, Arc::new(SystemClock)));
        let recompute = Arc::new(StoreBackedRecompute::new(store.clone() as Arc<dyn StoreGateway>));
        let demand = Arc::new(DemandTracker::new(cache.clone(), recompute));
        let pricing = Arc::new(PricingEngine::new(
            demand,
            Arc::new(NoopCurrencyProvider),
            Arc::new(UnavailableCompetitorProvider),
            30,
            0.5,
            0.2,
        ));
        let events = capture_sink() as Arc<dyn hotel_core::event_bus::EventSink>;
        let service = AvailabilityService::new(
            store.clone() as Arc<dyn StoreGateway>,
            cache,
            pricing,
            events.clone(),
            120,
            120,
        );
        (service, store, events)
    }

    #[tokio::test]
    async fn empty_range_returns_zero_length_view() {
        let (service, _store, _events) = sample_service().await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        let view = service
            .get_availability(&HotelId::from("h1"), date, date, "EUR", Utc::now())
            .await
            .unwrap();
        assert!(view.room_types.is_empty());
    }

    #[tokio::test]
    async fn counts_available_rooms_with_no_bookings() {
        let (service, _store, _events) = sample_service().await;
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let view = service
            .get_availability(&HotelId::from("h1"), check_in, check_out, "EUR", Utc::now())
            .await
            .unwrap();
        let simple = view.room_types.iter().find(|r| r.room_type == RoomType::Simple).unwrap();
        assert_eq!(simple.total_rooms, 2);
        assert_eq!(simple.available_rooms, 2);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let (service, _store, _events) = sample_service().await;
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let now = Utc::now();
        let first = service.get_availability(&HotelId::from("h1"), check_in, check_out, "EUR", now).await.unwrap();
        assert!(!first.from_cache);
        let second = service.get_availability(&HotelId::from("h1"), check_in, check_out, "EUR", now).await.unwrap();
        assert!(second.from_cache);
    }

    /// Converts at a fixed, non-identity rate so a test can tell a real
    /// conversion apart from a relabeled currency string.
    struct FixedRateCurrencyProvider {
        rate_from_eur: f64,
    }

    #[async_trait::async_trait]
    impl hotel_pricing::providers::CurrencyProvider for FixedRateCurrencyProvider {
        async fn convert(&self, amount: f64, from: &str, to: &str) -> anyhow::Result<hotel_pricing::providers::ConversionResult> {
            if from == to {
                return Ok(hotel_pricing::providers::ConversionResult { amount, rate: 1.0 });
            }
            if from == "EUR" {
                return Ok(hotel_pricing::providers::ConversionResult {
                    amount: amount * self.rate_from_eur,
                    rate: self.rate_from_eur,
                });
            }
            anyhow::bail!("no rate configured for {from} -> {to}")
        }
    }

    #[tokio::test]
    async fn cache_hit_converts_currency_instead_of_relabeling() {
        let store = Arc::new(InMemoryStore::new());
        store.put_hotel(sample_hotel("h1")).await.unwrap();
        store.put_room(sample_room("h1", "101", RoomType::Simple)).await.unwrap();
        store.put_room(sample_room("h1", "102", RoomType::Simple)).await.unwrap();

        let cache = Arc::new(HybridCache::new(Arc::new(MemKv(dashmap::DashMap::new())), 1000, Arc::new(SystemClock)));
        let recompute = Arc::new(StoreBackedRecompute::new(store.clone() as Arc<dyn StoreGateway>));
        let demand = Arc::new(DemandTracker::new(cache.clone(), recompute));
        let pricing = Arc::new(PricingEngine::new(
            demand,
            Arc::new(FixedRateCurrencyProvider { rate_from_eur: 2.0 }),
            Arc::new(UnavailableCompetitorProvider),
            30,
            0.5,
            0.2,
        ));
        let events = capture_sink() as Arc<dyn hotel_core::event_bus::EventSink>;
        let service = AvailabilityService::new(
            store.clone() as Arc<dyn StoreGateway>,
            cache,
            pricing,
            events,
            120,
            120,
        );

        let check_in = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let now = Utc::now();

        // First call populates the cache with EUR-denominated prices.
        let eur_view = service
            .get_availability(&HotelId::from("h1"), check_in, check_out, "EUR", now)
            .await
            .unwrap();
        assert!(!eur_view.from_cache);
        let eur_price = eur_view.room_types.iter().find(|r| r.room_type == RoomType::Simple).unwrap().current_price;
        assert!(eur_price > 0.0);

        // Second call, different currency, same cached entry: must be
        // converted (2x the EUR price at our fixed rate), not relabeled.
        let usd_view = service
            .get_availability(&HotelId::from("h1"), check_in, check_out, "USD", now)
            .await
            .unwrap();
        assert!(usd_view.from_cache);
        let usd_price = usd_view.room_types.iter().find(|r| r.room_type == RoomType::Simple).unwrap().current_price;
        assert_eq!(usd_view.currency, "USD");
        assert!((usd_price - eur_price * 2.0).abs() < 1e-9);
        assert_ne!(usd_price, eur_price);
    }

    #[tokio::test]
    async fn booking_changed_reduces_available_rooms() {
        let (service, store, _events) = sample_service().await;
        let check_in = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let now = Utc::now();
        store
            .put_booking(Booking {
                id: BookingId::from("b1"),
                hotel_id: HotelId::from("h1"),
                user_id: UserId::from("u1"),
                rooms: vec![BookingLine {
                    room_type: RoomType::Simple,
                    quantity: 1,
                }],
                check_in,
                check_out,
                status: BookingStatus::Confirmed,
                total_price: 200.0,
            })
            .await
            .unwrap();

        service
            .on_booking_changed(
                &HotelId::from("h1"),
                check_in,
                check_out,
                &[(RoomType::Simple, 1)],
                BookingAction::Book,
                now,
            )
            .await
            .unwrap();

        let view = service
            .get_availability(&HotelId::from("h1"), check_in, check_out, "EUR", now)
            .await
            .unwrap();
        let simple = view.room_types.iter().find(|r| r.room_type == RoomType::Simple).unwrap();
        assert_eq!(simple.available_rooms, 1);
    }
}
