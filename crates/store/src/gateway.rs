//! Read/write interface to the authoritative document store. The core
//! never reads a raw nested document — every access goes through this
//! trait and comes back as a strongly typed domain value from
//! `hotel_core::types` / `hotel_core::loyalty`.

use async_trait::async_trait;
use chrono::NaiveDate;
use hotel_core::error::HotelResult;
use hotel_core::loyalty::{LoyaltyAccount, LoyaltyTransaction};
use hotel_core::types::{Booking, BookingId, Hotel, HotelId, Room, RoomId, UserId};

#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn get_hotel(&self, hotel_id: &HotelId) -> HotelResult<Hotel>;
    async fn put_hotel(&self, hotel: Hotel) -> HotelResult<()>;

    async fn get_rooms_for_hotel(&self, hotel_id: &HotelId) -> HotelResult<Vec<Room>>;
    async fn get_room(&self, hotel_id: &HotelId, room_id: &RoomId) -> HotelResult<Room>;
    /// Insert or replace a room. Enforces `(hotelId, number)` uniqueness.
    async fn put_room(&self, room: Room) -> HotelResult<()>;

    /// Bookings whose `[checkIn, checkOut)` intersects `[check_in, check_out)`
    /// and whose status counts toward inventory (`Booking::is_active_for_inventory`).
    async fn get_overlapping_bookings(
        &self,
        hotel_id: &HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> HotelResult<Vec<Booking>>;
    async fn get_booking(&self, booking_id: &BookingId) -> HotelResult<Booking>;
    async fn put_booking(&self, booking: Booking) -> HotelResult<()>;

    async fn get_loyalty_account(&self, user_id: &UserId) -> HotelResult<Option<LoyaltyAccount>>;
    async fn put_loyalty_account(&self, account: LoyaltyAccount) -> HotelResult<()>;

    /// All transactions for a user, most-recently-issued first.
    async fn get_user_transactions(&self, user_id: &UserId) -> HotelResult<Vec<LoyaltyTransaction>>;
    /// All COMPLETED positive transactions across every user expiring in
    /// `(now, now + window]`, for the expiry scanner.
    async fn get_transactions_expiring_within(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        window: chrono::Duration,
    ) -> HotelResult<Vec<LoyaltyTransaction>>;
    /// Append-only: never mutates or removes an existing entry.
    async fn append_transaction(&self, tx: LoyaltyTransaction) -> HotelResult<()>;
}
