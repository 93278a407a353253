//! Loyalty domain types: tiers, the append-only transaction ledger, and
//! redemption catalog. The stateful engine (accrual, tier re-evaluation,
//! expiry sweeps) lives in the loyalty crate; this module only carries the
//! shapes and the table lookups both that crate and the pub/sub Hub need.

use crate::types::{BookingId, HotelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl LoyaltyTier {
    pub const ALL: [LoyaltyTier; 5] = [
        LoyaltyTier::Bronze,
        LoyaltyTier::Silver,
        LoyaltyTier::Gold,
        LoyaltyTier::Platinum,
        LoyaltyTier::Diamond,
    ];

    /// `lifetimePoints` threshold at or above which this tier is held.
    pub fn threshold(self) -> i64 {
        match self {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => 1_000,
            LoyaltyTier::Gold => 5_000,
            LoyaltyTier::Platinum => 15_000,
            LoyaltyTier::Diamond => 50_000,
        }
    }

    /// Highest tier whose threshold `lifetime_points` clears.
    pub fn for_lifetime_points(lifetime_points: i64) -> LoyaltyTier {
        LoyaltyTier::ALL
            .into_iter()
            .rev()
            .find(|tier| lifetime_points >= tier.threshold())
            .unwrap_or(LoyaltyTier::Bronze)
    }

    /// Points-accrual multiplier applied to `totalPrice` on booking completion.
    pub fn accrual_multiplier(self) -> f64 {
        match self {
            LoyaltyTier::Bronze => 1.0,
            LoyaltyTier::Silver => 1.2,
            LoyaltyTier::Gold => 1.5,
            LoyaltyTier::Platinum => 2.0,
            LoyaltyTier::Diamond => 2.5,
        }
    }

    /// Informational pricing discount a hotel may fold into the pricing stack.
    pub fn pricing_discount_multiplier(self) -> f64 {
        match self {
            LoyaltyTier::Bronze => 1.0,
            LoyaltyTier::Silver => 0.98,
            LoyaltyTier::Gold => 0.95,
            LoyaltyTier::Platinum => 0.92,
            LoyaltyTier::Diamond => 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Enrolled,
    Active,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    pub user_id: UserId,
    pub tier: LoyaltyTier,
    pub current_points: i64,
    pub lifetime_points: i64,
    pub enrolled_at: DateTime<Utc>,
    pub status: AccountStatus,
}

impl LoyaltyAccount {
    pub fn new(user_id: UserId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tier: LoyaltyTier::Bronze,
            current_points: 0,
            lifetime_points: 0,
            enrolled_at,
            status: AccountStatus::Enrolled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Reversed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionReason {
    BookingAccrual,
    Redemption,
    Expired,
    AdminAdjustment,
    CampaignBonus,
}

/// One entry in the append-only ledger. Reversal is always a new offsetting
/// entry — entries are never mutated or deleted once issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyTransaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub points_amount: i64,
    pub reason: TransactionReason,
    pub related_booking_id: Option<BookingId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
}

impl LoyaltyTransaction {
    pub fn accrual(
        user_id: UserId,
        points: i64,
        booking_id: BookingId,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            points_amount: points,
            reason: TransactionReason::BookingAccrual,
            related_booking_id: Some(booking_id),
            issued_at,
            expires_at: Some(issued_at + chrono::Duration::days(ACCRUAL_EXPIRY_MONTHS as i64 * 30)),
            status: TransactionStatus::Completed,
        }
    }

    pub fn is_expiring_within(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        match self.expires_at {
            Some(exp) => {
                self.status == TransactionStatus::Completed
                    && self.points_amount > 0
                    && exp > now
                    && exp <= now + window
            }
            None => false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => {
                self.status == TransactionStatus::Completed && self.points_amount > 0 && exp <= now
            }
            None => false,
        }
    }
}

pub const ACCRUAL_EXPIRY_MONTHS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionOption {
    Discount,
    Upgrade,
    FreeNight,
}

impl RedemptionOption {
    pub fn minimum_points(self) -> i64 {
        match self {
            RedemptionOption::Discount => 100,
            RedemptionOption::Upgrade => 1_000,
            RedemptionOption::FreeNight => 5_000,
        }
    }

    pub fn minimum_tier(self) -> LoyaltyTier {
        match self {
            RedemptionOption::Discount | RedemptionOption::Upgrade => LoyaltyTier::Bronze,
            RedemptionOption::FreeNight => LoyaltyTier::Gold,
        }
    }

    /// Cap, in points, on a single redemption of this option. `None` = uncapped.
    pub fn max_points_per_redemption(self) -> Option<i64> {
        match self {
            RedemptionOption::Discount => Some(5_000),
            _ => None,
        }
    }

    /// EUR value of one redemption point, where applicable.
    pub fn eur_per_point(self) -> Option<f64> {
        match self {
            RedemptionOption::Discount => Some(1.0 / 100.0),
            _ => None,
        }
    }

    pub fn eligible(self, tier: LoyaltyTier, points: i64) -> bool {
        tier >= self.minimum_tier() && points >= self.minimum_points()
    }
}

/// Urgency bucket for an expiry alert, by days remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryUrgency {
    Critical,
    High,
    Medium,
    Low,
}

impl ExpiryUrgency {
    pub fn for_days_remaining(days: i64) -> Option<ExpiryUrgency> {
        if days <= 7 {
            Some(ExpiryUrgency::Critical)
        } else if days <= 14 {
            Some(ExpiryUrgency::High)
        } else if days <= 30 {
            Some(ExpiryUrgency::Medium)
        } else if days <= 90 {
            Some(ExpiryUrgency::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    BonusMultiplier,
    BonusPoints,
    SpecialOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: crate::types::CampaignId,
    pub eligible_tiers: Vec<LoyaltyTier>,
    pub hotel_ids: Option<Vec<HotelId>>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub campaign_type: CampaignType,
}

impl Campaign {
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && at <= self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_for_lifetime_points_picks_highest_cleared() {
        assert_eq!(LoyaltyTier::for_lifetime_points(0), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_lifetime_points(999), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_lifetime_points(1_000), LoyaltyTier::Silver);
        assert_eq!(LoyaltyTier::for_lifetime_points(5_400), LoyaltyTier::Gold);
        assert_eq!(LoyaltyTier::for_lifetime_points(50_000), LoyaltyTier::Diamond);
    }

    #[test]
    fn redemption_eligibility_honors_tier_gate() {
        assert!(!RedemptionOption::FreeNight.eligible(LoyaltyTier::Silver, 6_000));
        assert!(RedemptionOption::FreeNight.eligible(LoyaltyTier::Gold, 6_000));
        assert!(!RedemptionOption::FreeNight.eligible(LoyaltyTier::Gold, 1_000));
    }

    #[test]
    fn expiry_urgency_buckets() {
        assert_eq!(ExpiryUrgency::for_days_remaining(3), Some(ExpiryUrgency::Critical));
        assert_eq!(ExpiryUrgency::for_days_remaining(10), Some(ExpiryUrgency::High));
        assert_eq!(ExpiryUrgency::for_days_remaining(25), Some(ExpiryUrgency::Medium));
        assert_eq!(ExpiryUrgency::for_days_remaining(80), Some(ExpiryUrgency::Low));
        assert_eq!(ExpiryUrgency::for_days_remaining(91), None);
    }

    #[test]
    fn transaction_expiry_window() {
        let now = Utc::now();
        let tx = LoyaltyTransaction::accrual(
            UserId::from("u1"),
            600,
            BookingId::from("b1"),
            now - chrono::Duration::days(23 * 30),
        );
        assert!(tx.is_expiring_within(now, chrono::Duration::days(90)));
        assert!(!tx.is_expired_at(now));
    }
}
