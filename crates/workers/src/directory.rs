//! Tracked-hotel registry: background workers iterate hotels without the
//! store exposing a "list all hotels" scan, so the binary registers hotel
//! ids here as they're created/loaded.

use hotel_core::types::HotelId;
use parking_lot::RwLock;

#[derive(Default)]
pub struct HotelDirectory {
    hotel_ids: RwLock<Vec<HotelId>>,
}

impl HotelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hotel_id: HotelId) {
        let mut ids = self.hotel_ids.write();
        if !ids.contains(&hotel_id) {
            ids.push(hotel_id);
        }
    }

    pub fn deregister(&self, hotel_id: &HotelId) {
        self.hotel_ids.write().retain(|id| id != hotel_id);
    }

    pub fn snapshot(&self) -> Vec<HotelId> {
        self.hotel_ids.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let dir = HotelDirectory::new();
        dir.register(HotelId::from("h1"));
        dir.register(HotelId::from("h1"));
        assert_eq!(dir.snapshot().len(), 1);
    }

    #[test]
    fn deregister_removes() {
        let dir = HotelDirectory::new();
        dir.register(HotelId::from("h1"));
        dir.deregister(&HotelId::from("h1"));
        assert!(dir.snapshot().is_empty());
    }
}
