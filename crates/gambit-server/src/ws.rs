//! `WebSocket` handler for live line streaming.
//!
//! Clients connect to `GET /ws/lines/{id}/{ply}` and receive every line
//! stored for that ply from then on, one JSON-encoded [`StoredLine`] per
//! text frame. Lines stored before the client connected are not replayed;
//! clients fetch those from `GET /api/games/{id}/lines/{ply}`.
//!
//! [`StoredLine`]: gambit_types::StoredLine

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use gambit_core::{LineSubscription, line_topic};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::handlers::parse_game_id;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming lines for one ply.
///
/// The subscription is registered before the upgrade completes, so no
/// line stored after the handshake can be missed.
///
/// # Route
///
/// `GET /ws/lines/{id}/{ply}`
pub async fn ws_lines<S, Q>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, ply)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id = parse_game_id(&id)?;
    let subscription = state.broker.subscribe(&line_topic(game_id, ply));
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, subscription)))
}

/// Forward each line on the subscription as a text frame until either
/// side goes away.
async fn handle_ws(mut socket: WebSocket, mut subscription: LineSubscription) {
    debug!(topic = subscription.topic(), "WebSocket client connected");

    loop {
        tokio::select! {
            line = subscription.recv() => {
                let Some(line) = line else {
                    debug!("Line broker closed, shutting down WebSocket");
                    return;
                };
                let json = match serde_json::to_string(&line) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize line: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    return;
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
                    // Clients have nothing to say on this channel.
                    _ => {}
                }
            }
        }
    }
}
