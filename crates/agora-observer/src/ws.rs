//! `WebSocket` live feed of simulation events.
//!
//! Clients connect to `GET /ws/events` and receive every event the tick
//! loop publishes, one JSON text frame per event. `?agent_id=<uuid>`
//! narrows the feed to events caused by one agent.
//!
//! A client that falls behind the bus skips the lost events and carries
//! on from the newest one; it never slows the tick loop.

use std::sync::Arc;

use agora_types::{AgentId, Event};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Query parameters for `GET /ws/events`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct FeedQuery {
    /// Only forward events caused by this agent.
    pub agent_id: Option<AgentId>,
}

impl FeedQuery {
    fn wants(&self, event: &Event) -> bool {
        self.agent_id.is_none_or(|id| event.agent_id == Some(id))
    }
}

/// Upgrade to a `WebSocket` and start streaming events.
pub async fn ws_events(
    ws: WebSocketUpgrade,
    Query(query): Query<FeedQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, query: FeedQuery) {
    debug!("WebSocket client connected");

    let mut rx = state.scheduler.bus().subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !query.wants(&event) {
                            continue;
                        }
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize event: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
