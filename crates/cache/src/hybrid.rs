//! Two-tier cache fronting every availability/pricing/demand/occupancy
//! read: shared store first (survives process restarts, shared across
//! workers), local map second (survives a shared-store outage).

use crate::kv::KvCacheDriver;
use crate::local::LocalCache;
use hotel_core::clock::Clock;
use hotel_core::error::HotelResult;
use hotel_core::types::{CacheCategory, CompressionAlgorithm, InvalidationStrategy};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

fn category_label(category: CacheCategory) -> &'static str {
    match category {
        CacheCategory::Availability => "availability",
        CacheCategory::Pricing => "pricing",
        CacheCategory::Demand => "demand",
        CacheCategory::Occupancy => "occupancy",
        CacheCategory::HotelData => "hotel_data",
    }
}

fn compress(bytes: &[u8], algorithm: CompressionAlgorithm) -> std::io::Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::Gzip => {
            let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(bytes)?;
            enc.finish()
        }
        CompressionAlgorithm::Deflate => {
            let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(bytes)?;
            enc.finish()
        }
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            let mut reader = bytes;
            brotli::BrotliCompress(&mut reader, &mut out, &brotli::enc::BrotliEncoderParams::default())?;
            Ok(out)
        }
    }
}

fn decompress(bytes: &[u8], algorithm: CompressionAlgorithm) -> std::io::Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::Gzip => {
            let mut dec = flate2::read::GzDecoder::new(bytes);
            let mut out = Vec::new();
            dec.read_to_end(&mut out)?;
            Ok(out)
        }
        CompressionAlgorithm::Deflate => {
            let mut dec = flate2::read::DeflateDecoder::new(bytes);
            let mut out = Vec::new();
            dec.read_to_end(&mut out)?;
            Ok(out)
        }
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            let mut reader = bytes;
            brotli::BrotliDecompress(&mut reader, &mut out)?;
            Ok(out)
        }
    }
}

/// Wire framing for a shared-store value: one header byte (1 = compressed
/// with the algorithm tag that follows, 0 = raw) plus the payload.
fn frame(value: &[u8], threshold: usize, algorithm: CompressionAlgorithm) -> Vec<u8> {
    if value.len() <= threshold {
        let mut out = Vec::with_capacity(value.len() + 1);
        out.push(0);
        out.extend_from_slice(value);
        return out;
    }
    match compress(value, algorithm) {
        Ok(compressed) => {
            let mut out = Vec::with_capacity(compressed.len() + 2);
            out.push(1);
            out.push(algorithm as u8);
            out.extend_from_slice(&compressed);
            out
        }
        Err(e) => {
            warn!(error = %e, "compression failed, storing raw");
            let mut out = Vec::with_capacity(value.len() + 1);
            out.push(0);
            out.extend_from_slice(value);
            out
        }
    }
}

fn unframe(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    match raw.split_first() {
        Some((0, rest)) => Ok(rest.to_vec()),
        Some((1, rest)) => {
            let (tag, payload) = rest.split_first().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated cache frame")
            })?;
            let algorithm = match tag {
                0 => CompressionAlgorithm::Gzip,
                1 => CompressionAlgorithm::Deflate,
                2 => CompressionAlgorithm::Brotli,
                _ => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "unknown compression tag",
                    ))
                }
            };
            decompress(payload, algorithm)
        }
        _ => Ok(Vec::new()),
    }
}

/// Per-hotel knobs the Hybrid Cache consults for a single operation.
#[derive(Debug, Clone, Copy)]
pub struct CacheTuning {
    pub compression_threshold_bytes: usize,
    pub compression_algorithm: CompressionAlgorithm,
    pub delayed_invalidation_ms: u64,
}

impl Default for CacheTuning {
    fn default() -> Self {
        Self {
            compression_threshold_bytes: 1024,
            compression_algorithm: CompressionAlgorithm::Gzip,
            delayed_invalidation_ms: 5_000,
        }
    }
}

/// Dependent tags a SMART/cascade invalidation also clears. Mirrors the
/// key-prefix scheme so invalidating `avail:{hotel}` also drops that
/// hotel's occupancy snapshot.
fn cascade_targets(tag: &str) -> Vec<String> {
    if let Some(hotel) = tag.strip_prefix("avail:") {
        let hotel_id = hotel.split(':').next().unwrap_or(hotel);
        vec![format!("occupancy:{hotel_id}")]
    } else {
        Vec::new()
    }
}

pub struct HybridCache {
    kv: Arc<dyn KvCacheDriver>,
    local: Arc<LocalCache>,
    clock: Arc<dyn Clock>,
}

impl HybridCache {
    pub fn new(kv: Arc<dyn KvCacheDriver>, local_capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            local: Arc::new(LocalCache::new(local_capacity)),
            clock,
        }
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn local_maintenance(&self) -> usize {
        self.local.evict_expired()
    }

    /// Shared store first, local fallback on miss or error. Never blocks a
    /// request path on a shared-store outage.
    pub async fn get(&self, key: &str, category: CacheCategory) -> HotelResult<Option<Vec<u8>>> {
        let label = category_label(category);
        match self.kv.get(key).await {
            Ok(Some(raw)) => {
                metrics::counter!("cache.l2.hit", "category" => label).increment(1);
                match unframe(&raw) {
                    Ok(value) => {
                        self.local
                            .put(key.to_string(), value.clone(), Vec::new(), Duration::from_secs(60));
                        return Ok(Some(value));
                    }
                    Err(e) => warn!(error = %e, key, "failed to decode shared-store frame"),
                }
            }
            Ok(None) => {
                metrics::counter!("cache.l2.miss", "category" => label).increment(1);
            }
            Err(e) => {
                metrics::counter!("cache.redis_errors", "category" => label).increment(1);
                debug!(error = %e, key, "shared cache unavailable, falling back to local tier");
            }
        }

        match self.local.get(key) {
            Some(value) => {
                metrics::counter!("cache.l1.hit", "category" => label).increment(1);
                Ok(Some((*value).clone()))
            }
            None => {
                metrics::counter!("cache.l1.miss", "category" => label).increment(1);
                Ok(None)
            }
        }
    }

    /// Writes both tiers. A shared-store failure is logged and does not
    /// fail the call — the local tier still holds the fresh value.
    pub async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        category: CacheCategory,
        tags: Vec<String>,
        ttl: Duration,
        tuning: CacheTuning,
    ) -> HotelResult<()> {
        let label = category_label(category);
        self.local
            .put(key.to_string(), value.clone(), tags.clone(), ttl);

        let framed = frame(&value, tuning.compression_threshold_bytes, tuning.compression_algorithm);
        if let Err(e) = self.kv.set(key, framed, ttl).await {
            metrics::counter!("cache.redis_errors", "category" => label).increment(1);
            warn!(error = %e, key, "shared cache set failed, local tier still populated");
            return Ok(());
        }
        for tag in &tags {
            if let Err(e) = self.kv.tag(tag, key).await {
                debug!(error = %e, tag, "tag registration failed");
            }
        }
        Ok(())
    }

    /// Delete `tag` from both tiers, applying the hotel's invalidation
    /// strategy. IMMEDIATE and the immediate half of SMART return only
    /// after both tiers are clear; DELAYED schedules the clear.
    pub async fn invalidate(&self, tag: &str, strategy: InvalidationStrategy, tuning: CacheTuning) -> HotelResult<()> {
        match strategy {
            InvalidationStrategy::Immediate => self.invalidate_now(tag).await,
            InvalidationStrategy::Delayed => {
                self.schedule_delayed(tag.to_string(), tuning.delayed_invalidation_ms);
                Ok(())
            }
            InvalidationStrategy::Scheduled => {
                // A cron sweeper (see the workers crate) reconciles tags against
                // the authoritative store; this call only clears the local tier
                // so readers aren't served a definitely-stale value in the interim.
                self.local.remove_by_tag(tag);
                Ok(())
            }
            InvalidationStrategy::Smart => {
                if tag.starts_with("avail:") {
                    self.invalidate_now(tag).await?;
                } else {
                    self.schedule_delayed(tag.to_string(), tuning.delayed_invalidation_ms);
                }
                for dependent in cascade_targets(tag) {
                    self.invalidate_now(&dependent).await?;
                }
                Ok(())
            }
        }
    }

    async fn invalidate_now(&self, tag: &str) -> HotelResult<()> {
        self.local.remove_by_tag(tag);
        self.local.remove_by_prefix(tag);
        let members = self.kv.tag_members(tag).await.unwrap_or_default();
        for key in members {
            let _ = self.kv.del(&key).await;
        }
        let _ = self.kv.del(&format!("tagset:{tag}")).await;
        metrics::counter!("cache.invalidations").increment(1);
        Ok(())
    }

    fn schedule_delayed(&self, tag: String, delay_ms: u64) {
        let local = Arc::clone(&self.local);
        let kv = Arc::clone(&self.kv);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            local.remove_by_tag(&tag);
            local.remove_by_prefix(&tag);
            if let Ok(members) = kv.tag_members(&tag).await {
                for key in members {
                    let _ = kv.del(&key).await;
                }
            }
            let _ = kv.del(&format!("tagset:{tag}")).await;
            metrics::counter!("cache.invalidations").increment(1);
        });
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use hotel_core::clock::SystemClock;

    #[derive(Default)]
    struct FlakyKv {
        fail_get: std::sync::atomic::AtomicBool,
        store: DashMap<String, Vec<u8>>,
        tags: DashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl KvCacheDriver for FlakyKv {
        async fn get(&self, key: &str) -> HotelResult<Option<Vec<u8>>> {
            if self.fail_get.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(hotel_core::error::HotelError::CacheUnavailable("down".into()));
            }
            Ok(self.store.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> HotelResult<()> {
            self.store.insert(key.to_string(), value);
            Ok(())
        }
        async fn del(&self, key: &str) -> HotelResult<()> {
            self.store.remove(key);
            Ok(())
        }
        async fn tag(&self, tag: &str, key: &str) -> HotelResult<()> {
            self.tags.entry(tag.to_string()).or_default().push(key.to_string());
            Ok(())
        }
        async fn tag_members(&self, tag: &str) -> HotelResult<Vec<String>> {
            Ok(self.tags.get(tag).map(|v| v.clone()).unwrap_or_default())
        }
        async fn ping(&self) -> HotelResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let kv = Arc::new(FlakyKv::default());
        let cache = HybridCache::new(kv, 100, Arc::new(SystemClock));
        cache
            .set(
                "avail:h1:2025-07-10:2025-07-12",
                b"payload".to_vec(),
                CacheCategory::Availability,
                vec!["avail:h1".into()],
                Duration::from_secs(60),
                CacheTuning::default(),
            )
            .await
            .unwrap();
        let got = cache.get("avail:h1:2025-07-10:2025-07-12", CacheCategory::Availability).await.unwrap();
        assert_eq!(got, Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn shared_outage_falls_back_to_local() {
        let kv = Arc::new(FlakyKv::default());
        let cache = HybridCache::new(Arc::clone(&kv) as Arc<dyn KvCacheDriver>, 100, Arc::new(SystemClock));
        cache
            .set(
                "hotel:h1:profile",
                b"data".to_vec(),
                CacheCategory::HotelData,
                vec![],
                Duration::from_secs(60),
                CacheTuning::default(),
            )
            .await
            .unwrap();
        kv.fail_get.store(true, std::sync::atomic::Ordering::SeqCst);
        let got = cache.get("hotel:h1:profile", CacheCategory::HotelData).await.unwrap();
        assert_eq!(got, Some(b"data".to_vec()));
    }

    #[tokio::test]
    async fn invalidate_clears_both_tiers() {
        let kv = Arc::new(FlakyKv::default());
        let cache = HybridCache::new(Arc::clone(&kv) as Arc<dyn KvCacheDriver>, 100, Arc::new(SystemClock));
        cache
            .set(
                "avail:h1:2025-07-10:2025-07-12",
                b"payload".to_vec(),
                CacheCategory::Availability,
                vec!["avail:h1".into()],
                Duration::from_secs(60),
                CacheTuning::default(),
            )
            .await
            .unwrap();
        cache
            .invalidate("avail:h1", InvalidationStrategy::Immediate, CacheTuning::default())
            .await
            .unwrap();
        let got = cache.get("avail:h1:2025-07-10:2025-07-12", CacheCategory::Availability).await.unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn frame_round_trips_below_and_above_threshold() {
        let small = vec![1u8; 10];
        let large = vec![2u8; 4096];
        for tuning in [
            CacheTuning {
                compression_threshold_bytes: 1024,
                ..Default::default()
            },
        ] {
            let framed_small = frame(&small, tuning.compression_threshold_bytes, tuning.compression_algorithm);
            assert_eq!(unframe(&framed_small).unwrap(), small);
            let framed_large = frame(&large, tuning.compression_threshold_bytes, tuning.compression_algorithm);
            assert_eq!(unframe(&framed_large).unwrap(), large);
            assert!(framed_large.len() < large.len() + 2);
        }
    }
}
