//! Pub/Sub Hub: authenticated bidirectional channel manager. Maintains room
//! memberships and per-user direct addressing with bounded, offline-tolerant
//! delivery. Wire transport (the actual WebSocket) lives in the API crate;
//! this module only owns membership state and routing.

use dashmap::{DashMap, DashSet};
use hotel_core::error::HotelError;
use hotel_core::event_bus::{DomainEvent, EventSink};
use hotel_core::loyalty::LoyaltyTier;
use hotel_core::types::{HotelId, Role, UserId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type SessionId = String;

/// Per-user offline queue cap.
const OFFLINE_QUEUE_CAP: usize = 1000;
/// Per-session live outbound queue cap. Small relative to the offline queue:
/// a connected socket is expected to drain promptly, so a deep backlog here
/// means the consumer is stalled, not merely between polls.
pub const LIVE_QUEUE_CAP: usize = 256;

struct SessionHandle {
    user_id: UserId,
    role: Role,
    hotel_id: Option<HotelId>,
    loyalty_tier: Option<LoyaltyTier>,
    sender: mpsc::Sender<DomainEvent>,
    rooms: DashSet<String>,
}

#[derive(Debug, Default)]
pub struct HubMetricsSnapshot {
    pub price_updates: u64,
    pub demand_alerts: u64,
    pub revenue_optimizations: u64,
    pub loyalty_events: u64,
    pub queue_full_drops: u64,
}

#[derive(Default)]
struct HubCounters {
    price_updates: AtomicU64,
    demand_alerts: AtomicU64,
    revenue_optimizations: AtomicU64,
    loyalty_events: AtomicU64,
    queue_full_drops: AtomicU64,
}

/// Auto-join rooms on connect, keyed by role.
fn auto_join_rooms(
    role: Role,
    hotel_id: Option<&HotelId>,
    user_id: &UserId,
    loyalty_tier: Option<LoyaltyTier>,
) -> Vec<String> {
    let mut rooms = Vec::new();
    match role {
        Role::Admin => rooms.extend(
            ["admin", "yield-admin", "revenue-monitoring", "loyalty-admin", "loyalty-dashboard"]
                .map(String::from),
        ),
        Role::Receptionist => {
            if let Some(h) = hotel_id {
                rooms.push(format!("hotel:{h}"));
                rooms.push(format!("pricing:{h}"));
                rooms.push(format!("loyalty-hotel:{h}"));
            }
        }
        Role::Client => {
            rooms.push("clients".to_string());
            rooms.push(format!("user:{user_id}"));
        }
    }
    if let Some(tier) = loyalty_tier {
        rooms.push("loyalty-members".to_string());
        rooms.push(format!("loyalty-tier:{tier:?}"));
        for t in LoyaltyTier::ALL {
            if t <= tier {
                rooms.push(format!("tier-benefits:{t:?}"));
            }
        }
    }
    rooms
}

/// Whether `role`/`hotel_id`/`loyalty_tier` may join `room`. Denied joins
/// never mutate membership.
fn authorize_join(room: &str, role: Role, hotel_id: Option<&HotelId>, loyalty_tier: Option<LoyaltyTier>) -> bool {
    if let Some(h) = room.strip_prefix("pricing:") {
        return role == Role::Admin
            || (role == Role::Receptionist && hotel_id.map(HotelId::as_str) == Some(h))
            || role == Role::Client;
    }
    if matches!(room, "yield-admin" | "revenue-monitoring" | "loyalty-admin" | "loyalty-dashboard") {
        return role == Role::Admin;
    }
    if room.starts_with("chain-loyalty:") {
        return loyalty_tier.map(|t| t >= LoyaltyTier::Gold).unwrap_or(false);
    }
    if room.starts_with("cross-hotel:") {
        return loyalty_tier.map(|t| t >= LoyaltyTier::Platinum).unwrap_or(false);
    }
    true
}

pub struct PubSubHub {
    rooms: DashMap<String, DashSet<SessionId>>,
    sessions: DashMap<SessionId, SessionHandle>,
    user_sessions: DashMap<UserId, SessionId>,
    offline_queues: DashMap<UserId, Mutex<VecDeque<DomainEvent>>>,
    counters: HubCounters,
}

impl Default for PubSubHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
            offline_queues: DashMap::new(),
            counters: HubCounters::default(),
        }
    }

    /// Registers a new session, auto-joins its role rooms, and replays any
    /// offline queue the user accumulated while disconnected. Returns the
    /// rooms the session was placed in.
    pub fn connect(
        &self,
        session_id: SessionId,
        user_id: UserId,
        role: Role,
        hotel_id: Option<HotelId>,
        loyalty_tier: Option<LoyaltyTier>,
        sender: mpsc::Sender<DomainEvent>,
    ) -> Vec<String> {
        let rooms = auto_join_rooms(role, hotel_id.as_ref(), &user_id, loyalty_tier);
        let handle = SessionHandle {
            user_id: user_id.clone(),
            role,
            hotel_id,
            loyalty_tier,
            sender: sender.clone(),
            rooms: DashSet::new(),
        };
        for room in &rooms {
            handle.rooms.insert(room.clone());
            self.rooms.entry(room.clone()).or_default().insert(session_id.clone());
        }
        self.sessions.insert(session_id.clone(), handle);
        self.user_sessions.insert(user_id.clone(), session_id);

        if let Some(queue) = self.offline_queues.get(&user_id) {
            let drained: Vec<DomainEvent> = {
                let mut q = queue.lock();
                q.drain(..).collect()
            };
            for event in drained {
                self.deliver(&user_id, &sender, event);
            }
        }
        rooms
    }

    pub fn disconnect(&self, session_id: &SessionId) {
        if let Some((_, handle)) = self.sessions.remove(session_id) {
            let joined: Vec<String> = handle.rooms.iter().map(|r| r.clone()).collect();
            for room in joined {
                if let Some(members) = self.rooms.get(&room) {
                    members.remove(session_id);
                }
            }
            if self.user_sessions.get(&handle.user_id).map(|s| s.clone()) == Some(session_id.clone()) {
                self.user_sessions.remove(&handle.user_id);
            }
        }
    }

    /// Attempts to join `room`; denied joins leave membership untouched and
    /// return `Unauthorized`.
    pub fn join_room(&self, session_id: &SessionId, room: &str) -> Result<(), HotelError> {
        let Some(handle) = self.sessions.get(session_id) else {
            return Err(HotelError::NotFound(format!("session {session_id}")));
        };
        if !authorize_join(room, handle.role, handle.hotel_id.as_ref(), handle.loyalty_tier) {
            return Err(HotelError::Unauthorized(format!("not permitted to join {room}")));
        }
        handle.rooms.insert(room.to_string());
        self.rooms.entry(room.to_string()).or_default().insert(session_id.clone());
        Ok(())
    }

    pub fn leave_room(&self, session_id: &SessionId, room: &str) {
        if let Some(handle) = self.sessions.get(session_id) {
            handle.rooms.remove(room);
        }
        if let Some(members) = self.rooms.get(room) {
            members.remove(session_id);
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.user_sessions.contains_key(user_id)
    }

    pub fn metrics_snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            price_updates: self.counters.price_updates.load(Ordering::Relaxed),
            demand_alerts: self.counters.demand_alerts.load(Ordering::Relaxed),
            revenue_optimizations: self.counters.revenue_optimizations.load(Ordering::Relaxed),
            loyalty_events: self.counters.loyalty_events.load(Ordering::Relaxed),
            queue_full_drops: self.counters.queue_full_drops.load(Ordering::Relaxed),
        }
    }

    fn tally(&self, event: &DomainEvent) {
        match event {
            DomainEvent::PriceUpdate { .. } => {
                self.counters.price_updates.fetch_add(1, Ordering::Relaxed);
            }
            DomainEvent::DemandSurgeAlert { .. } => {
                self.counters.demand_alerts.fetch_add(1, Ordering::Relaxed);
            }
            DomainEvent::RevenueOptimization { .. } => {
                self.counters.revenue_optimizations.fetch_add(1, Ordering::Relaxed);
            }
            DomainEvent::LoyaltyPointsEarned { .. }
            | DomainEvent::LoyaltyTierUpgraded { .. }
            | DomainEvent::LoyaltyPointsExpiryAlert { .. }
            | DomainEvent::LoyaltyPointsRedeemed { .. } => {
                self.counters.loyalty_events.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        metrics::counter!("pubsub.events", "type" => event.event_name()).increment(1);
    }

    /// Delivers to a live session's bounded outbound queue. A full queue
    /// means the socket's consumer isn't draining fast enough to keep up
    /// live, so the event is redirected to the user's offline queue (itself
    /// bounded, drop-oldest) rather than blocking the emitting caller or
    /// silently discarding the event. A closed queue means the session is
    /// mid-disconnect; same treatment.
    fn deliver(&self, user_id: &UserId, sender: &mpsc::Sender<DomainEvent>, event: DomainEvent) {
        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(returned)) => {
                warn!(%user_id, "live queue full, enqueuing as offline");
                metrics::counter!("pubsub.live_queue_full").increment(1);
                self.enqueue_offline(user_id, returned);
            }
            Err(mpsc::error::TrySendError::Closed(returned)) => {
                self.enqueue_offline(user_id, returned);
            }
        }
    }

    fn enqueue_offline(&self, user_id: &UserId, event: DomainEvent) {
        let queue = self.offline_queues.entry(user_id.clone()).or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut q = queue.lock();
        if q.len() >= OFFLINE_QUEUE_CAP {
            q.pop_front();
            self.counters.queue_full_drops.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("pubsub.offline_queue_full").increment(1);
        }
        q.push_back(event);
    }
}

impl EventSink for PubSubHub {
    fn emit(&self, event: DomainEvent) {
        self.tally(&event);

        for room in event.rooms() {
            let members: Option<Vec<SessionId>> = self.rooms.get(&room).map(|m| m.iter().map(|s| s.clone()).collect());
            match members {
                Some(members) if !members.is_empty() => {
                    for session_id in members {
                        if let Some(handle) = self.sessions.get(&session_id) {
                            self.deliver(&handle.user_id, &handle.sender, event.clone());
                        }
                    }
                }
                _ => debug!(room, "no active members for room"),
            }
        }

        if let Some(user_id) = event.direct_user().cloned() {
            if let Some(session_id) = self.user_sessions.get(&user_id) {
                if let Some(handle) = self.sessions.get(session_id.value()) {
                    self.deliver(&user_id, &handle.sender, event);
                    return;
                }
            }
            self.enqueue_offline(&user_id, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hotel_core::types::RoomType;

    fn channel() -> (mpsc::Sender<DomainEvent>, mpsc::Receiver<DomainEvent>) {
        mpsc::channel(LIVE_QUEUE_CAP)
    }

    #[test]
    fn admin_auto_joins_admin_rooms() {
        let hub = PubSubHub::new();
        let (tx, _rx) = channel();
        let rooms = hub.connect("s1".into(), UserId::from("admin1"), Role::Admin, None, None, tx);
        assert!(rooms.contains(&"yield-admin".to_string()));
        assert!(rooms.contains(&"loyalty-admin".to_string()));
    }

    #[test]
    fn client_cannot_join_yield_admin() {
        let hub = PubSubHub::new();
        let (tx, _rx) = channel();
        hub.connect("s1".into(), UserId::from("u1"), Role::Client, None, None, tx);
        let err = hub.join_room(&"s1".to_string(), "yield-admin").unwrap_err();
        assert_eq!(err.kind(), hotel_core::error::ErrorKind::Unauthorized);
        assert_eq!(hub.room_size("yield-admin"), 0);
    }

    #[test]
    fn gold_tier_may_join_chain_loyalty() {
        let hub = PubSubHub::new();
        let (tx, _rx) = channel();
        hub.connect(
            "s1".into(),
            UserId::from("u1"),
            Role::Client,
            None,
            Some(LoyaltyTier::Gold),
            tx,
        );
        assert!(hub.join_room(&"s1".to_string(), "chain-loyalty:c1").is_ok());
    }

    #[test]
    fn price_update_reaches_pricing_room_member() {
        let hub = PubSubHub::new();
        let (tx, mut rx) = channel();
        hub.connect("s1".into(), UserId::from("recep1"), Role::Receptionist, Some(HotelId::from("h1")), None, tx);

        hub.emit(DomainEvent::PriceUpdate {
            hotel_id: HotelId::from("h1"),
            room_type: RoomType::Simple,
            date: chrono::NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            new_price: 120.0,
            emitted_at: Utc::now(),
        });

        let received = rx.try_recv().unwrap();
        assert!(matches!(received, DomainEvent::PriceUpdate { .. }));
        assert_eq!(hub.metrics_snapshot().price_updates, 1);
    }

    #[test]
    fn direct_event_to_offline_user_is_queued_and_replayed_on_connect() {
        let hub = PubSubHub::new();
        hub.emit(DomainEvent::LoyaltyPointsEarned {
            user_id: UserId::from("u1"),
            points: 100,
            new_balance: 100,
            emitted_at: Utc::now(),
        });

        let (tx, mut rx) = channel();
        hub.connect("s1".into(), UserId::from("u1"), Role::Client, None, None, tx);
        let replayed = rx.try_recv().unwrap();
        assert!(matches!(replayed, DomainEvent::LoyaltyPointsEarned { .. }));
    }

    #[test]
    fn direct_event_to_full_live_queue_is_enqueued_as_offline() {
        let hub = PubSubHub::new();
        let (tx, rx) = mpsc::channel(1);
        hub.connect("s1".into(), UserId::from("u1"), Role::Client, None, None, tx);

        // Fill the live queue's single slot, then send a second event that
        // cannot be placed live.
        hub.emit(DomainEvent::LoyaltyPointsEarned {
            user_id: UserId::from("u1"),
            points: 10,
            new_balance: 10,
            emitted_at: Utc::now(),
        });
        hub.emit(DomainEvent::LoyaltyPointsEarned {
            user_id: UserId::from("u1"),
            points: 20,
            new_balance: 30,
            emitted_at: Utc::now(),
        });

        // The live queue only ever yields the first event; the second was
        // redirected to the offline queue rather than blocking or dropping.
        let first = rx.try_recv().unwrap();
        assert!(matches!(first, DomainEvent::LoyaltyPointsEarned { points: 10, .. }));
        assert!(rx.try_recv().is_err());

        hub.disconnect(&"s1".to_string());
        let (tx2, mut rx2) = channel();
        hub.connect("s2".into(), UserId::from("u1"), Role::Client, None, None, tx2);
        let replayed = rx2.try_recv().unwrap();
        assert!(matches!(replayed, DomainEvent::LoyaltyPointsEarned { points: 20, .. }));
    }

    #[test]
    fn disconnect_removes_from_all_joined_rooms() {
        let hub = PubSubHub::new();
        let (tx, _rx) = channel();
        hub.connect("s1".into(), UserId::from("u1"), Role::Client, None, None, tx);
        assert_eq!(hub.room_size("clients"), 1);
        hub.disconnect(&"s1".to_string());
        assert_eq!(hub.room_size("clients"), 0);
        assert!(!hub.is_connected(&UserId::from("u1")));
    }
}
