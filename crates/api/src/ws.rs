//! WebSocket upgrade handler: pumps [`DomainEvent`]s from the Pub/Sub Hub
//! straight onto the socket, already tagged in their wire shape, and
//! dispatches inbound join/leave messages back into the Hub.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hotel_core::event_bus::DomainEvent;
use hotel_core::loyalty::LoyaltyTier;
use hotel_core::types::{HotelId, Role, UserId};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Dev-mode connection parameters carried as query params. A production
/// deployment would derive these from a verified session token instead.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    pub role: Role,
    pub hotel_id: Option<String>,
    pub loyalty_tier: Option<LoyaltyTier>,
}

/// Inbound client frames: the only client-initiated mutations are room
/// join/leave, since all state changes flow through the REST surface.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    Join { room: String },
    Leave { room: String },
}

/// GET /v1/ws
pub async fn handle_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: AppState, query: ConnectQuery) {
    let session_id = Uuid::new_v4().to_string();
    let user_id = UserId::from(query.user_id);
    let hotel_id = query.hotel_id.map(HotelId::from);
    let (tx, mut rx) = mpsc::channel::<DomainEvent>(hotel_pubsub::hub::LIVE_QUEUE_CAP);

    let rooms = state
        .hub
        .connect(session_id.clone(), user_id.clone(), query.role, hotel_id, query.loyalty_tier, tx);
    debug!(%session_id, %user_id, ?rooms, "websocket connected");
    metrics::gauge!("api.ws_sessions").increment(1.0);

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(payload) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let hub = state.hub.clone();
    let recv_session_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { room }) => {
                        if let Err(err) = hub.join_room(&recv_session_id, &room) {
                            warn!(%err, room, "join denied");
                        }
                    }
                    Ok(ClientMessage::Leave { room }) => hub.leave_room(&recv_session_id, &room),
                    Err(err) => warn!(%err, "malformed client frame"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.disconnect(&session_id);
    metrics::gauge!("api.ws_sessions").decrement(1.0);
    debug!(%session_id, "websocket disconnected");
}
