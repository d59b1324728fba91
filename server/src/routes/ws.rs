//! `GET /ws`: downstream push connections.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde_json::json;
use tracing::debug;

use crate::state::AppState;

pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| session(state, socket))
}

/// Registers the socket with the hub, greets it, and forwards hub frames
/// until either side goes away. Inbound text is ignored.
async fn session(state: AppState, mut socket: WebSocket) {
    let (id, mut frames) = state.hub.register();
    let welcome = json!({ "type": "welcome" }).to_string();
    if socket.send(Message::Text(welcome)).await.is_err() {
        state.hub.remove(id);
        return;
    }

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.hub.remove(id);
    debug!(client = id, "websocket session ended");
}
