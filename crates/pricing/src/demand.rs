//! Demand Tracker — bounded per-(hotel, roomType, date) counters feeding
//! the Pricing Engine. Counters are cache-resident (`demand:` keys, 15
//! minute TTL); a lazy recompute runs on TTL-miss via an injected
//! [`DemandRecompute`] source so this crate never talks to the document
//! store directly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hotel_cache::hybrid::{CacheTuning, HybridCache};
use hotel_core::error::HotelResult;
use hotel_core::types::{CacheCategory, DemandLevel, DemandSample, DemandThresholds, HotelId, RoomType};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub fn demand_key(hotel_id: &HotelId, room_type: RoomType, date: NaiveDate) -> String {
    format!("demand:{hotel_id}:{room_type:?}:{date}")
}

/// Authoritative recount, injected so the tracker never depends on the
/// store gateway directly. The Availability Service supplies the live
/// implementation (overlapping-bookings aggregation).
#[async_trait]
pub trait DemandRecompute: Send + Sync {
    async fn recompute(&self, hotel_id: &HotelId, room_type: RoomType, date: NaiveDate) -> HotelResult<i64>;
    async fn capacity(&self, hotel_id: &HotelId, room_type: RoomType) -> HotelResult<u32>;
}

const DEMAND_TTL: Duration = Duration::from_secs(900);
const VELOCITY_WINDOW: chrono::Duration = chrono::Duration::hours(1);

pub struct DemandTracker {
    cache: Arc<HybridCache>,
    recompute: Arc<dyn DemandRecompute>,
    thresholds: DemandThresholds,
    /// Rolling timestamps of `record` calls with positive delta, per
    /// (hotel, roomType), for `velocityMultiplier`.
    velocity: Arc<dashmap::DashMap<(HotelId, RoomType), Mutex<VecDeque<DateTime<Utc>>>>>,
}

impl DemandTracker {
    pub fn new(cache: Arc<HybridCache>, recompute: Arc<dyn DemandRecompute>) -> Self {
        Self {
            cache,
            recompute,
            thresholds: DemandThresholds::default(),
            velocity: Arc::new(dashmap::DashMap::new()),
        }
    }

    /// Atomic add to the (hotel, roomType, date) counter. Positive deltas
    /// (bookings) are also folded into the velocity window.
    pub async fn record(
        &self,
        hotel_id: &HotelId,
        room_type: RoomType,
        date: NaiveDate,
        delta: i64,
        now: DateTime<Utc>,
    ) -> HotelResult<()> {
        let key = demand_key(hotel_id, room_type, date);
        let mut sample = self.read_sample(hotel_id, room_type, date, &key).await?;
        sample.bookings_count = (sample.bookings_count + delta).max(0);
        sample.last_updated = now;
        self.write_sample(&key, sample).await?;

        if delta > 0 {
            let entry = self
                .velocity
                .entry((hotel_id.clone(), room_type))
                .or_insert_with(|| Mutex::new(VecDeque::new()));
            let mut window = entry.lock().await;
            window.push_back(now);
            while let Some(front) = window.front() {
                if now.signed_duration_since(*front) > VELOCITY_WINDOW {
                    window.pop_front();
                } else {
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn level(&self, hotel_id: &HotelId, room_type: RoomType, date: NaiveDate) -> HotelResult<DemandLevel> {
        let key = demand_key(hotel_id, room_type, date);
        let sample = self.read_sample(hotel_id, room_type, date, &key).await?;
        let capacity = self.recompute.capacity(hotel_id, room_type).await?;
        Ok(sample.level(capacity, &self.thresholds))
    }

    /// Bookings-per-hour in the trailing window mapped to a tiered multiplier.
    pub async fn velocity_multiplier(&self, hotel_id: &HotelId, room_type: RoomType) -> f64 {
        let Some(entry) = self.velocity.get(&(hotel_id.clone(), room_type)) else {
            return 1.0;
        };
        let window = entry.lock().await;
        let per_hour = window.len() as f64;
        if per_hour > 2.0 {
            1.3
        } else if per_hour > 1.0 {
            1.15
        } else if per_hour > 0.5 {
            1.05
        } else {
            1.0
        }
    }

    async fn read_sample(
        &self,
        hotel_id: &HotelId,
        room_type: RoomType,
        date: NaiveDate,
        key: &str,
    ) -> HotelResult<DemandSample> {
        if let Some(raw) = self.cache.get(key, CacheCategory::Demand).await? {
            if let Ok(sample) = serde_json::from_slice::<DemandSample>(&raw) {
                return Ok(sample);
            }
        }
        let count = self.recompute.recompute(hotel_id, room_type, date).await?;
        let sample = DemandSample {
            bookings_count: count,
            last_updated: Utc::now(),
        };
        self.write_sample(key, sample).await?;
        Ok(sample)
    }

    async fn write_sample(&self, key: &str, sample: DemandSample) -> HotelResult<()> {
        let bytes = serde_json::to_vec(&sample)?;
        self.cache
            .set(
                key,
                bytes,
                CacheCategory::Demand,
                vec![format!("demand:{}", key.split(':').nth(1).unwrap_or_default())],
                DEMAND_TTL,
                CacheTuning::default(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_cache::kv::KvCacheDriver;
    use hotel_core::clock::SystemClock;

    struct FakeRecompute {
        count: i64,
        capacity: u32,
    }

    #[async_trait]
    impl DemandRecompute for FakeRecompute {
        async fn recompute(&self, _hotel_id: &HotelId, _room_type: RoomType, _date: NaiveDate) -> HotelResult<i64> {
            Ok(self.count)
        }
        async fn capacity(&self, _hotel_id: &HotelId, _room_type: RoomType) -> HotelResult<u32> {
            Ok(self.capacity)
        }
    }

    struct MemKv(dashmap::DashMap<String, Vec<u8>>);

    #[async_trait]
    impl KvCacheDriver for MemKv {
        async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>> {
            Ok(self.0.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> HotelResult<()> {
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

    fn tracker(count: i64, capacity: u32) -> DemandTracker {
        let cache = Arc::new(HybridCache::new(Arc::new(MemKv(dashmap::DashMap::new())), 1000, Arc::new(SystemClock)));
        DemandTracker::new(cache, Arc::new(FakeRecompute { count, capacity }))
    }

    #[tokio::test]
    async fn level_maps_ratio_through_thresholds() {
        let tracker = tracker(72, 100);
        let level = tracker
            .level(&HotelId::from("h1"), RoomType::Simple, NaiveDate::from_ymd_opt(2025, 7, 12).unwrap())
            .await
            .unwrap();
        assert_eq!(level, DemandLevel::High);
    }

    #[tokio::test]
    async fn record_updates_counter_on_cache_hit() {
        let tracker = tracker(0, 10);
        let hotel = HotelId::from("h1");
        let date = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        let now = Utc::now();
        tracker.record(&hotel, RoomType::Simple, date, 3, now).await.unwrap();
        let key = demand_key(&hotel, RoomType::Simple, date);
        let raw = tracker.cache.get(&key, CacheCategory::Demand).await.unwrap().unwrap();
        let sample: DemandSample = serde_json::from_slice(&raw).unwrap();
        assert_eq!(sample.bookings_count, 3);
    }

    #[tokio::test]
    async fn velocity_multiplier_tiers_by_bookings_per_hour() {
        let tracker = tracker(0, 10);
        let hotel = HotelId::from("h1");
        let now = Utc::now();
        assert_eq!(tracker.velocity_multiplier(&hotel, RoomType::Simple).await, 1.0);
        for _ in 0..3 {
            tracker
                .record(&hotel, RoomType::Simple, Utc::now().date_naive(), 1, now)
                .await
                .unwrap();
        }
        assert_eq!(tracker.velocity_multiplier(&hotel, RoomType::Simple).await, 1.3);
    }
}
