//! In-memory reference implementation of [`StoreGateway`], backed by
//! `DashMap`.
//!
//! Production: replace with a document-store-backed implementation behind
//! the same trait. This provides the same API surface for development,
//! demos, and every other crate's tests.

use crate::gateway::StoreGateway;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use hotel_core::error::{HotelError, HotelResult};
use hotel_core::loyalty::{LoyaltyAccount, LoyaltyTransaction};
use hotel_core::types::{Booking, BookingId, Hotel, HotelId, Room, RoomId, UserId};
use tracing::info;

pub struct InMemoryStore {
    hotels: DashMap<HotelId, Hotel>,
    rooms: DashMap<RoomId, Room>,
    bookings: DashMap<BookingId, Booking>,
    loyalty_accounts: DashMap<UserId, LoyaltyAccount>,
    /// Append-only; insertion order is preserved within each user's `Vec`.
    loyalty_transactions: DashMap<UserId, Vec<LoyaltyTransaction>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        info!("store gateway initialized (in-memory, development mode)");
        Self {
            hotels: DashMap::new(),
            rooms: DashMap::new(),
            bookings: DashMap::new(),
            loyalty_accounts: DashMap::new(),
            loyalty_transactions: DashMap::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreGateway for InMemoryStore {
    async fn get_hotel(&self, hotel_id: &HotelId) -> HotelResult<Hotel> {
        self.hotels
            .get(hotel_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| HotelError::NotFound(format!("hotel {hotel_id}")))
    }

    async fn put_hotel(&self, hotel: Hotel) -> HotelResult<()> {
        if !hotel.qr_settings_valid() {
            return Err(HotelError::Validation(
                "qrSettings.enabled requires an enabled QR type and, if geolocation is required, coordinates".into(),
            ));
        }
        self.hotels.insert(hotel.id.clone(), hotel);
        Ok(())
    }

    async fn get_rooms_for_hotel(&self, hotel_id: &HotelId) -> HotelResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| &r.hotel_id == hotel_id)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn get_room(&self, hotel_id: &HotelId, room_id: &RoomId) -> HotelResult<Room> {
        self.rooms
            .get(room_id)
            .filter(|r| &r.hotel_id == hotel_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| HotelError::NotFound(format!("room {room_id} at hotel {hotel_id}")))
    }

    async fn put_room(&self, room: Room) -> HotelResult<()> {
        if let Some(constraints) = room
            .yield_override
            .as_ref()
            .and_then(|y| y.price_constraints.as_ref())
        {
            if room.base_price < constraints.min_price || room.base_price > constraints.max_price {
                return Err(HotelError::Validation(format!(
                    "room {} base price {} outside constraints [{}, {}]",
                    room.id, room.base_price, constraints.min_price, constraints.max_price
                )));
            }
        }
        let duplicate = self
            .rooms
            .iter()
            .any(|r| r.hotel_id == room.hotel_id && r.number == room.number && r.id != room.id);
        if duplicate {
            return Err(HotelError::Conflict(format!(
                "room number {} already exists at hotel {}",
                room.number, room.hotel_id
            )));
        }
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn get_overlapping_bookings(
        &self,
        hotel_id: &HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> HotelResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                &b.hotel_id == hotel_id
                    && b.is_active_for_inventory()
                    && b.overlaps(check_in, check_out)
            })
            .map(|b| b.value().clone())
            .collect())
    }

    async fn get_booking(&self, booking_id: &BookingId) -> HotelResult<Booking> {
        self.bookings
            .get(booking_id)
            .map(|b| b.value().clone())
            .ok_or_else(|| HotelError::NotFound(format!("booking {booking_id}")))
    }

    async fn put_booking(&self, booking: Booking) -> HotelResult<()> {
        if booking.check_in >= booking.check_out {
            return Err(HotelError::Validation("checkIn must be before checkOut".into()));
        }
        self.bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn get_loyalty_account(&self, user_id: &UserId) -> HotelResult<Option<LoyaltyAccount>> {
        Ok(self.loyalty_accounts.get(user_id).map(|a| a.value().clone()))
    }

    async fn put_loyalty_account(&self, account: LoyaltyAccount) -> HotelResult<()> {
        self.loyalty_accounts.insert(account.user_id.clone(), account);
        Ok(())
    }

    async fn get_user_transactions(&self, user_id: &UserId) -> HotelResult<Vec<LoyaltyTransaction>> {
        let mut txs = self
            .loyalty_transactions
            .get(user_id)
            .map(|v| v.value().clone())
            .unwrap_or_default();
        txs.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(txs)
    }

    async fn get_transactions_expiring_within(
        &self,
        now: DateTime<Utc>,
        window: chrono::Duration,
    ) -> HotelResult<Vec<LoyaltyTransaction>> {
        Ok(self
            .loyalty_transactions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|tx| tx.is_expiring_within(now, window) || tx.is_expired_at(now))
            .collect())
    }

    async fn append_transaction(&self, tx: LoyaltyTransaction) -> HotelResult<()> {
        self.loyalty_transactions
            .entry(tx.user_id.clone())
            .or_default()
            .push(tx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_core::loyalty::{AccountStatus, LoyaltyTier};
    use hotel_core::types::{BookingLine, BookingStatus, RoomType};

    fn sample_booking(id: &str, hotel: &str, in_: (i32, u32, u32), out: (i32, u32, u32)) -> Booking {
        Booking {
            id: BookingId::from(id),
            hotel_id: HotelId::from(hotel),
            user_id: UserId::from("u1"),
            rooms: vec![BookingLine {
                room_type: RoomType::Simple,
                quantity: 1,
            }],
            check_in: NaiveDate::from_ymd_opt(in_.0, in_.1, in_.2).unwrap(),
            check_out: NaiveDate::from_ymd_opt(out.0, out.1, out.2).unwrap(),
            status: BookingStatus::Confirmed,
            total_price: 200.0,
        }
    }

    #[tokio::test]
    async fn overlapping_bookings_filters_by_date_and_status() {
        let store = InMemoryStore::new();
        store
            .put_booking(sample_booking("b1", "h1", (2025, 7, 10), (2025, 7, 12)))
            .await
            .unwrap();
        let mut cancelled = sample_booking("b2", "h1", (2025, 7, 10), (2025, 7, 12));
        cancelled.status = BookingStatus::Cancelled;
        store.put_booking(cancelled).await.unwrap();

        let overlapping = store
            .get_overlapping_bookings(
                &HotelId::from("h1"),
                NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 13).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(overlapping.len(), 1);
        assert_eq!(overlapping[0].id, BookingId::from("b1"));
    }

    #[tokio::test]
    async fn duplicate_room_number_rejected() {
        let store = InMemoryStore::new();
        let room = Room {
            id: RoomId::from("r1"),
            hotel_id: HotelId::from("h1"),
            number: "101".into(),
            floor: 1,
            room_type: RoomType::Simple,
            base_price: 100.0,
            status: hotel_core::types::RoomStatus::Available,
            amenities: vec![],
            yield_override: None,
            current_dynamic_price: None,
            price_history: Default::default(),
            yield_suggestions: Default::default(),
        };
        store.put_room(room.clone()).await.unwrap();
        let mut dup = room;
        dup.id = RoomId::from("r2");
        let err = store.put_room(dup).await.unwrap_err();
        assert_eq!(err.kind(), hotel_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn loyalty_transactions_are_append_only_and_sorted_newest_first() {
        let store = InMemoryStore::new();
        let user = UserId::from("u1");
        store
            .put_loyalty_account(LoyaltyAccount {
                user_id: user.clone(),
                tier: LoyaltyTier::Bronze,
                current_points: 0,
                lifetime_points: 0,
                enrolled_at: Utc::now(),
                status: AccountStatus::Enrolled,
            })
            .await
            .unwrap();
        let early = LoyaltyTransaction::accrual(user.clone(), 100, BookingId::from("b1"), Utc::now() - chrono::Duration::days(1));
        let late = LoyaltyTransaction::accrual(user.clone(), 200, BookingId::from("b2"), Utc::now());
        store.append_transaction(early).await.unwrap();
        store.append_transaction(late.clone()).await.unwrap();

        let txs = store.get_user_transactions(&user).await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, late.id);
    }
}
