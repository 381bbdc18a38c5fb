//! WebSocket handler for live reload.
//!
//! Each connection registers itself with the broadcaster and forwards queued
//! reload messages to the browser. Inbound messages are ignored.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;

use super::broadcaster::SessionId;
use crate::state::AppState;

/// Handle WebSocket upgrade for live reload.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let id = SessionId::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.broadcaster.register_session(id, tx);
    tracing::debug!(session = %id, "Client WebSocket connection opened");

    loop {
        tokio::select! {
            // Forward reload messages to client
            queued = rx.recv() => {
                let Some(message) = queued else {
                    // Registry dropped us: server is shutting down
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(session = %id, error = %err, "Failed to encode reload message");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(message)) => {
                        tracing::debug!(session = %id, ?message, "Ignoring message from WebSocket client");
                    }
                }
            }
        }
    }

    state.broadcaster.deregister_session(id);
    tracing::debug!(session = %id, "Client WebSocket connection closed");
}
