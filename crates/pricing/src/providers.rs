//! External collaborator contracts: currency conversion and competitor
//! pricing. Both are optional at the call site — a provider failure
//! degrades the corresponding pricing factor rather than failing the whole
//! quote.

use async_trait::async_trait;
use hotel_cache::hybrid::{CacheTuning, HybridCache};
use hotel_core::types::{CacheCategory, HotelId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ConversionResult {
    pub amount: f64,
    pub rate: f64,
}

#[async_trait]
pub trait CurrencyProvider: Send + Sync {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> anyhow::Result<ConversionResult>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
    pub our_price: f64,
    pub avg_price: f64,
}

#[async_trait]
pub trait CompetitorProvider: Send + Sync {
    async fn fetch(&self, hotel_id: &HotelId) -> anyhow::Result<Option<CompetitorSnapshot>>;
}

/// Identity conversion, used when no real currency provider is wired up
/// (and as a deterministic test double).
pub struct NoopCurrencyProvider;

#[async_trait]
impl CurrencyProvider for NoopCurrencyProvider {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> anyhow::Result<ConversionResult> {
        if from == to {
            Ok(ConversionResult { amount, rate: 1.0 })
        } else {
            anyhow::bail!("no currency provider configured for {from} -> {to}")
        }
    }
}

/// Always reports "no data" — used when no competitor-price provider is
/// wired up. The Pricing Engine treats this identically to a fetch error:
/// skip the competitor factor.
pub struct UnavailableCompetitorProvider;

#[async_trait]
impl CompetitorProvider for UnavailableCompetitorProvider {
    async fn fetch(&self, _hotel_id: &HotelId) -> anyhow::Result<Option<CompetitorSnapshot>> {
        Ok(None)
    }
}

/// Decorates a [`CompetitorProvider`] with an hourly cache so the pricing
/// hot path never blocks on a live competitor fetch. The competitor-refresh
/// background worker calls `fetch` on its own schedule purely to keep this
/// cache warm.
pub struct CachingCompetitorProvider {
    inner: Arc<dyn CompetitorProvider>,
    cache: Arc<HybridCache>,
    ttl: Duration,
}

impl CachingCompetitorProvider {
    pub fn new(inner: Arc<dyn CompetitorProvider>, cache: Arc<HybridCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl CompetitorProvider for CachingCompetitorProvider {
    async fn fetch(&self, hotel_id: &HotelId) -> anyhow::Result<Option<CompetitorSnapshot>> {
        let key = format!("competitor:{hotel_id}");
        if let Ok(Some(raw)) = self.cache.get(&key, CacheCategory::HotelData).await {
            if let Ok(snapshot) = serde_json::from_slice::<CompetitorSnapshot>(&raw) {
                return Ok(Some(snapshot));
            }
        }
        let fetched = self.inner.fetch(hotel_id).await?;
        if let Some(snapshot) = fetched {
            if let Ok(bytes) = serde_json::to_vec(&snapshot) {
                let _ = self
                    .cache
                    .set(&key, bytes, CacheCategory::HotelData, vec![key.clone()], self.ttl, CacheTuning::default())
                    .await;
            }
        }
        Ok(fetched)
    }
}
