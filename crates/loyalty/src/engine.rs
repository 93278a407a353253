//! Loyalty Engine: accrual, tier evaluation, redemption, expiry sweeps, and
//! campaign fan-out over the append-only transaction ledger.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hotel_core::clock::Clock;
use hotel_core::config::LoyaltyConfig;
use hotel_core::error::{HotelError, HotelResult};
use hotel_core::event_bus::{DomainEvent, EventSink};
use hotel_core::loyalty::{
    AccountStatus, Campaign, ExpiryUrgency, LoyaltyAccount, LoyaltyTransaction, RedemptionOption,
    TransactionReason, TransactionStatus,
};
use hotel_core::types::{BookingId, HotelId, UserId};
use hotel_store::StoreGateway;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// Summary returned from a redemption attempt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RedemptionResult {
    pub points_spent: i64,
    pub new_balance: i64,
}

/// Engine over the loyalty ledger. All per-user mutation (accrue, redeem,
/// expire) is serialized by a per-user lock so `currentPoints` never
/// observes interleaved writes.
pub struct LoyaltyEngine {
    store: Arc<dyn StoreGateway>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: LoyaltyConfig,
    locks: DashMap<UserId, Arc<AsyncMutex<()>>>,
}

impl LoyaltyEngine {
    pub fn new(store: Arc<dyn StoreGateway>, events: Arc<dyn EventSink>, clock: Arc<dyn Clock>, config: LoyaltyConfig) -> Self {
        info!(
            accrual_expiry_months = config.accrual_expiry_months,
            "Loyalty engine initialized"
        );
        Self {
            store,
            events,
            clock,
            config,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.locks.entry(user_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    async fn load_or_enroll(&self, user_id: &UserId) -> HotelResult<LoyaltyAccount> {
        match self.store.get_loyalty_account(user_id).await? {
            Some(account) => Ok(account),
            None => Ok(LoyaltyAccount::new(user_id.clone(), self.clock.now())),
        }
    }

    /// Recomputes `currentPoints`/`lifetimePoints` from the ledger, the
    /// single authoritative source for both figures.
    fn recompute_balances(account: &mut LoyaltyAccount, transactions: &[LoyaltyTransaction]) {
        let current: i64 = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| tx.points_amount)
            .sum();
        let lifetime: i64 = transactions
            .iter()
            .filter(|tx| tx.points_amount > 0 && tx.status != TransactionStatus::Reversed)
            .map(|tx| tx.points_amount)
            .sum();
        account.current_points = current;
        account.lifetime_points = lifetime;
    }

    /// Evaluates tier from `lifetimePoints` and, on upgrade, emits
    /// `loyalty-tier-upgraded` and moves the subscriber between
    /// `loyalty-tier:*` rooms (handled by the Hub reacting to the event).
    /// Per §9 open question, tier never demotes here — only accrual moves it.
    fn evaluate_tier(&self, account: &mut LoyaltyAccount, now: DateTime<Utc>) {
        let candidate = hotel_core::loyalty::LoyaltyTier::for_lifetime_points(account.lifetime_points);
        if candidate > account.tier {
            let old_tier = account.tier;
            account.tier = candidate;
            let bonus_points = if self.config.tier_upgrade_bonus_points > 0 {
                Some(self.config.tier_upgrade_bonus_points)
            } else {
                None
            };
            metrics::counter!("loyalty.tier_upgrades").increment(1);
            info!(user_id = %account.user_id, old = ?old_tier, new = ?candidate, "Tier upgrade");
            self.events.emit(DomainEvent::LoyaltyTierUpgraded {
                user_id: account.user_id.clone(),
                old_tier,
                new_tier: candidate,
                bonus_points,
                emitted_at: now,
            });
        }
    }

    /// Accrues points for a booking transitioning to `COMPLETED`:
    /// `points = round(totalPrice * tierMultiplier(tier))`.
    pub async fn accrue_for_booking(
        &self,
        user_id: &UserId,
        booking_id: BookingId,
        total_price: f64,
    ) -> HotelResult<LoyaltyAccount> {
        if total_price < 0.0 || !total_price.is_finite() {
            return Err(HotelError::Validation(format!("invalid totalPrice {total_price}")));
        }
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let mut account = self.load_or_enroll(user_id).await?;
        if account.status == AccountStatus::Enrolled {
            account.status = AccountStatus::Active;
        }

        let points = (total_price * account.tier.accrual_multiplier()).round() as i64;
        let tx = LoyaltyTransaction::accrual(user_id.clone(), points, booking_id, now);
        self.store.append_transaction(tx).await?;

        let transactions = self.store.get_user_transactions(user_id).await?;
        Self::recompute_balances(&mut account, &transactions);
        self.evaluate_tier(&mut account, now);

        metrics::counter!("loyalty.points_accrued").increment(points.max(0) as u64);
        debug!(user_id = %user_id, points, balance = account.current_points, "points accrued");

        self.events.emit(DomainEvent::LoyaltyPointsEarned {
            user_id: user_id.clone(),
            points,
            new_balance: account.current_points,
            emitted_at: now,
        });

        self.store.put_loyalty_account(account.clone()).await?;
        Ok(account)
    }

    /// Redeems `option` for `points`, enforcing tier gate, minimum, and cap.
    /// Atomic at the per-user lock: the append and balance write happen
    /// under the same critical section.
    pub async fn redeem(&self, user_id: &UserId, option: RedemptionOption, points: i64) -> HotelResult<RedemptionResult> {
        if points <= 0 {
            return Err(HotelError::Validation("redemption amount must be positive".to_string()));
        }
        if let Some(cap) = option.max_points_per_redemption() {
            if points > cap {
                return Err(HotelError::Validation(format!("redemption of {points} exceeds cap of {cap}")));
            }
        }

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let mut account = self.load_or_enroll(user_id).await?;

        if !option.eligible(account.tier, account.current_points) {
            return Err(HotelError::Validation(format!(
                "{option:?} not available at tier {:?} with {} points",
                account.tier, account.current_points
            )));
        }
        if account.current_points < points {
            return Err(HotelError::Validation(format!(
                "insufficient points: need {points}, have {}",
                account.current_points
            )));
        }

        let tx = LoyaltyTransaction {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.clone(),
            points_amount: -points,
            reason: TransactionReason::Redemption,
            related_booking_id: None,
            issued_at: now,
            expires_at: None,
            status: TransactionStatus::Completed,
        };
        self.store.append_transaction(tx).await?;

        let transactions = self.store.get_user_transactions(user_id).await?;
        Self::recompute_balances(&mut account, &transactions);

        metrics::counter!("loyalty.points_redeemed").increment(points as u64);
        metrics::counter!("loyalty.redemptions").increment(1);
        info!(user_id = %user_id, option = ?option, points, balance = account.current_points, "points redeemed");

        self.events.emit(DomainEvent::LoyaltyPointsRedeemed {
            user_id: user_id.clone(),
            points_spent: points,
            new_balance: account.current_points,
            emitted_at: now,
        });

        self.store.put_loyalty_account(account).await?;
        Ok(RedemptionResult {
            points_spent: points,
            new_balance: self.store.get_loyalty_account(user_id).await?.map(|a| a.current_points).unwrap_or(0),
        })
    }

    /// Background sweep: alerts on near-expiring transactions and offsets
    /// transactions whose `expiresAt` has passed.
    pub async fn run_expiry_scan(&self) -> HotelResult<ExpiryScanReport> {
        let now = self.clock.now();
        let mut report = ExpiryScanReport::default();

        let expiring_soon = self
            .store
            .get_transactions_expiring_within(now, Duration::days(90))
            .await?;
        for tx in &expiring_soon {
            let days_remaining = (tx.expires_at.unwrap() - now).num_days();
            if let Some(urgency) = ExpiryUrgency::for_days_remaining(days_remaining) {
                if tx.points_amount >= self.config.expiry_scan_minimum_points {
                    report.alerts_emitted += 1;
                    self.events.emit(DomainEvent::LoyaltyPointsExpiryAlert {
                        user_id: tx.user_id.clone(),
                        points_expiring: tx.points_amount,
                        urgency,
                        expires_at: tx.expires_at.unwrap(),
                        emitted_at: now,
                    });
                }
            }
        }

        let mut distinct_users: Vec<UserId> = expiring_soon.iter().map(|tx| tx.user_id.clone()).collect();
        distinct_users.sort();
        distinct_users.dedup();
        for user_id in distinct_users {
            let lock = self.lock_for(&user_id);
            let _guard = lock.lock().await;
            let transactions = self.store.get_user_transactions(&user_id).await?;
            for tx in transactions.iter().filter(|tx| tx.is_expired_at(now)) {
                let offset = LoyaltyTransaction {
                    id: uuid::Uuid::new_v4(),
                    user_id: user_id.clone(),
                    points_amount: -tx.points_amount,
                    reason: TransactionReason::Expired,
                    related_booking_id: tx.related_booking_id.clone(),
                    issued_at: now,
                    expires_at: None,
                    status: TransactionStatus::Completed,
                };
                self.store.append_transaction(offset).await?;
                report.transactions_expired += 1;
            }
            if report.transactions_expired > 0 {
                if let Some(mut account) = self.store.get_loyalty_account(&user_id).await? {
                    let transactions = self.store.get_user_transactions(&user_id).await?;
                    Self::recompute_balances(&mut account, &transactions);
                    self.store.put_loyalty_account(account).await?;
                }
            }
        }

        metrics::counter!("loyalty.expiry_scans").increment(1);
        metrics::counter!("loyalty.points_expired").increment(report.transactions_expired as u64);
        info!(alerts = report.alerts_emitted, expired = report.transactions_expired, "expiry scan complete");
        Ok(report)
    }

    /// Fans out a campaign: `campaign-update` to the campaign room,
    /// `campaign-opportunity` to each eligible tier room, and
    /// `hotel-campaign-notification` to each targeted hotel's room.
    pub fn broadcast_campaign(&self, campaign: &Campaign) {
        let now = self.clock.now();
        self.events.emit(DomainEvent::CampaignUpdate {
            campaign_id: campaign.id.clone(),
            emitted_at: now,
        });
        for tier in &campaign.eligible_tiers {
            self.events.emit(DomainEvent::CampaignOpportunity {
                campaign_id: campaign.id.clone(),
                tier: *tier,
                emitted_at: now,
            });
        }
        if let Some(hotel_ids) = &campaign.hotel_ids {
            for hotel_id in hotel_ids {
                self.emit_hotel_notification(campaign, hotel_id, now);
            }
        }
        metrics::counter!("loyalty.campaigns_broadcast").increment(1);
    }

    fn emit_hotel_notification(&self, campaign: &Campaign, hotel_id: &HotelId, now: DateTime<Utc>) {
        self.events.emit(DomainEvent::HotelCampaignNotification {
            campaign_id: campaign.id.clone(),
            hotel_id: hotel_id.clone(),
            emitted_at: now,
        });
    }

    pub async fn status(&self, user_id: &UserId) -> HotelResult<LoyaltyAccount> {
        self.load_or_enroll(user_id).await
    }

    /// Redemption options currently available to `user_id`, per their tier
    /// and balance.
    pub async fn available_redemptions(&self, user_id: &UserId) -> HotelResult<Vec<RedemptionOption>> {
        let account = self.load_or_enroll(user_id).await?;
        Ok([RedemptionOption::Discount, RedemptionOption::Upgrade, RedemptionOption::FreeNight]
            .into_iter()
            .filter(|opt| opt.eligible(account.tier, account.current_points))
            .collect())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ExpiryScanReport {
    pub alerts_emitted: u64,
    pub transactions_expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hotel_core::clock::FixedClock;
    use hotel_core::event_bus::capture_sink;
    use hotel_core::loyalty::LoyaltyTier;
    use hotel_store::memory::InMemoryStore;

    fn engine_at(now: DateTime<Utc>) -> (Arc<LoyaltyEngine>, Arc<hotel_core::event_bus::CaptureSink>) {
        let store = Arc::new(InMemoryStore::new());
        let capture = capture_sink();
        let clock = Arc::new(FixedClock::new(now));
        let engine = Arc::new(LoyaltyEngine::new(store, capture.clone() as Arc<dyn EventSink>, clock, LoyaltyConfig::default()));
        (engine, capture)
    }

    #[tokio::test]
    async fn accrual_uses_tier_multiplier_and_crosses_silver_threshold() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let (engine, capture) = engine_at(now);
        let user = UserId::from("u1");

        // Bronze multiplier 1.0x; two bookings push lifetimePoints over 1000.
        engine.accrue_for_booking(&user, BookingId::from("b1"), 600.0).await.unwrap();
        let account = engine.accrue_for_booking(&user, BookingId::from("b2"), 500.0).await.unwrap();

        assert_eq!(account.lifetime_points, 1100);
        assert_eq!(account.tier, LoyaltyTier::Silver);
        assert_eq!(capture.count_named("loyalty-tier-upgraded"), 1);
        assert_eq!(capture.count_named("loyalty-points-earned"), 2);
    }

    #[tokio::test]
    async fn redeem_discount_requires_minimum_and_caps() {
        let now = Utc::now();
        let (engine, _capture) = engine_at(now);
        let user = UserId::from("u1");
        engine.accrue_for_booking(&user, BookingId::from("b1"), 5_000.0).await.unwrap();

        let err = engine.redeem(&user, RedemptionOption::Discount, 6_000).await.unwrap_err();
        assert_eq!(err.kind(), hotel_core::error::ErrorKind::Validation);

        let result = engine.redeem(&user, RedemptionOption::Discount, 2_000).await.unwrap();
        assert_eq!(result.points_spent, 2_000);
        assert_eq!(result.new_balance, 3_000);
    }

    #[tokio::test]
    async fn free_night_requires_gold_tier() {
        let now = Utc::now();
        let (engine, _capture) = engine_at(now);
        let user = UserId::from("u1");
        engine.accrue_for_booking(&user, BookingId::from("b1"), 3_000.0).await.unwrap();

        let err = engine.redeem(&user, RedemptionOption::FreeNight, 5_000).await.unwrap_err();
        assert_eq!(err.kind(), hotel_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn expiry_scan_alerts_then_expires_transaction() {
        let issue_at = Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap();
        let expires_at = issue_at + Duration::days(24 * 30);

        let store = Arc::new(InMemoryStore::new());
        let capture = capture_sink();
        let clock = Arc::new(FixedClock::new(expires_at - Duration::days(6)));
        let engine = LoyaltyEngine::new(store.clone(), capture.clone() as Arc<dyn EventSink>, clock.clone(), LoyaltyConfig::default());
        let user = UserId::from("u1");

        let tx = LoyaltyTransaction::accrual(user.clone(), 800, BookingId::from("b1"), issue_at);
        store.append_transaction(tx).await.unwrap();
        store.put_loyalty_account(LoyaltyAccount {
            user_id: user.clone(),
            tier: LoyaltyTier::Bronze,
            current_points: 800,
            lifetime_points: 800,
            enrolled_at: issue_at,
            status: AccountStatus::Active,
        }).await.unwrap();

        let report = engine.run_expiry_scan().await.unwrap();
        assert_eq!(report.alerts_emitted, 1);
        assert_eq!(report.transactions_expired, 0);
        assert_eq!(capture.count_named("loyalty-points-expiry-alert"), 1);

        clock.set(expires_at);
        let report = engine.run_expiry_scan().await.unwrap();
        assert_eq!(report.transactions_expired, 1);

        let account = store.get_loyalty_account(&user).await.unwrap().unwrap();
        assert_eq!(account.current_points, 0);
    }

    #[tokio::test]
    async fn conservation_invariant_holds_after_redeem() {
        let now = Utc::now();
        let (engine, _capture) = engine_at(now);
        let user = UserId::from("u1");
        engine.accrue_for_booking(&user, BookingId::from("b1"), 1_000.0).await.unwrap();
        let before = engine.status(&user).await.unwrap().current_points;
        engine.redeem(&user, RedemptionOption::Upgrade, 1_000).await.unwrap();
        let after = engine.status(&user).await.unwrap().current_points;
        assert_eq!(after, before - 1_000);
    }
}
