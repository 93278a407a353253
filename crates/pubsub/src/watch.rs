//! Price-Watch Subsystem: a decorating [`EventSink`] that observes
//! `price-update` events and fans out direct `price-alert`s to watching
//! users, then forwards every event unchanged to the wrapped sink.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use hotel_core::event_bus::{DomainEvent, EventSink};
use hotel_core::types::{HotelId, RoomType, UserId};
use parking_lot::Mutex;
use std::sync::Arc;

const WATCH_TTL: chrono::Duration = chrono::Duration::minutes(30);

#[derive(Debug, Clone)]
pub struct PriceWatch {
    pub user_id: UserId,
    pub hotel_id: HotelId,
    pub room_types: Vec<RoomType>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub max_price: f64,
    pub alert_threshold_pct: f64,
    pub last_renewed: DateTime<Utc>,
    pub alerts_sent: u64,
}

impl PriceWatch {
    fn is_active(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_renewed) <= WATCH_TTL
    }

    fn covers_dates(&self, check_in: NaiveDate) -> bool {
        match (self.check_in, self.check_out) {
            (Some(from), Some(to)) => check_in >= from && check_in < to,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct WatchKey(UserId, HotelId, RoomType);

/// Wraps the Hub (or any [`EventSink`]) to add price-watch fan-out without
/// the pricing/availability code needing to know watches exist.
pub struct WatchRegistry {
    inner: Arc<dyn EventSink>,
    watches: DashMap<WatchKey, Mutex<PriceWatch>>,
    last_price: DashMap<(HotelId, RoomType), f64>,
}

impl WatchRegistry {
    pub fn new(inner: Arc<dyn EventSink>) -> Self {
        Self {
            inner,
            watches: DashMap::new(),
            last_price: DashMap::new(),
        }
    }

    /// Registers or replaces a watch for every room type it names.
    pub fn upsert(&self, watch: PriceWatch) {
        for room_type in watch.room_types.clone() {
            let key = WatchKey(watch.user_id.clone(), watch.hotel_id.clone(), room_type);
            self.watches.insert(key, Mutex::new(watch.clone()));
        }
    }

    /// Renews a watch's TTL on reconnect.
    pub fn renew(&self, user_id: &UserId, hotel_id: &HotelId, room_type: RoomType, now: DateTime<Utc>) {
        let key = WatchKey(user_id.clone(), hotel_id.clone(), room_type);
        if let Some(watch) = self.watches.get(&key) {
            watch.lock().last_renewed = now;
        }
    }

    fn check_and_alert(
        &self,
        hotel_id: &HotelId,
        room_type: RoomType,
        check_in: NaiveDate,
        new_price: f64,
        old_price: Option<f64>,
        now: DateTime<Utc>,
    ) {
        let drop_pct = match old_price {
            Some(old_price) if old_price > 0.0 => ((old_price - new_price) / old_price).max(0.0),
            _ => 0.0,
        };

        for entry in self.watches.iter() {
            let WatchKey(user_id, w_hotel, w_room_type) = entry.key().clone();
            if &w_hotel != hotel_id || w_room_type != room_type {
                continue;
            }
            let mut watch = entry.value().lock();
            if !watch.is_active(now) || !watch.covers_dates(check_in) {
                continue;
            }
            let triggers = new_price <= watch.max_price || drop_pct * 100.0 >= watch.alert_threshold_pct;
            if triggers {
                watch.alerts_sent += 1;
                self.inner.emit(DomainEvent::PriceAlert {
                    user_id: user_id.clone(),
                    hotel_id: hotel_id.clone(),
                    room_type,
                    new_price,
                    max_price: watch.max_price,
                    emitted_at: now,
                });
            }
        }
    }
}

impl EventSink for WatchRegistry {
    fn emit(&self, event: DomainEvent) {
        if let DomainEvent::PriceUpdate {
            hotel_id,
            room_type,
            date,
            new_price,
            emitted_at,
        } = &event
        {
            let previous = self.last_price.insert((hotel_id.clone(), *room_type), *new_price);
            self.check_and_alert(hotel_id, *room_type, *date, *new_price, previous, *emitted_at);
        }
        self.inner.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_core::event_bus::capture_sink;

    fn watch(user: &str, hotel: &str, room_type: RoomType, max_price: f64, threshold_pct: f64, now: DateTime<Utc>) -> PriceWatch {
        PriceWatch {
            user_id: UserId::from(user),
            hotel_id: HotelId::from(hotel),
            room_types: vec![room_type],
            check_in: None,
            check_out: None,
            max_price,
            alert_threshold_pct: threshold_pct,
            last_renewed: now,
            alerts_sent: 0,
        }
    }

    #[test]
    fn price_drop_below_max_triggers_alert() {
        let capture = capture_sink();
        let registry = WatchRegistry::new(capture.clone() as Arc<dyn EventSink>);
        let now = Utc::now();
        registry.upsert(watch("u1", "h1", RoomType::Simple, 100.0, 50.0, now));

        let date = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        registry.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date,
            new_price: 150.0,
            emitted_at: now,
        });
        registry.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date,
            new_price: 90.0,
            emitted_at: now,
        });

        assert_eq!(capture.count_named("price-alert"), 1);
        assert_eq!(capture.count_named("price-update"), 2);
    }

    #[test]
    fn first_price_update_already_below_max_triggers_alert() {
        let capture = capture_sink();
        let registry = WatchRegistry::new(capture.clone() as Arc<dyn EventSink>);
        let now = Utc::now();
        registry.upsert(watch("u2", "h1", RoomType::Simple, 150.0, 50.0, now));

        let date = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        registry.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date,
            new_price: 140.0,
            emitted_at: now,
        });

        assert_eq!(capture.count_named("price-alert"), 1);
    }

    #[test]
    fn expired_watch_does_not_alert() {
        let capture = capture_sink();
        let registry = WatchRegistry::new(capture.clone() as Arc<dyn EventSink>);
        let now = Utc::now();
        let mut stale = watch("u1", "h1", RoomType::Simple, 200.0, 5.0, now);
        stale.last_renewed = now - chrono::Duration::minutes(40);
        registry.upsert(stale);

        let date = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        registry.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date,
            new_price: 150.0,
            emitted_at: now,
        });
        registry.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date,
            new_price: 90.0,
            emitted_at: now,
        });

        assert_eq!(capture.count_named("price-alert"), 0);
    }
}
