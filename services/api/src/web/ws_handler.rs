//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a map-editing WebSocket
//! connection. The first message must be `init`; every later message is
//! applied to the session's [`EditorSession`] and answered with a snapshot.

use crate::web::{
    editor::{EditorSession, Outcome},
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use chapter_map_core::viewer::Viewer;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{error, info, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, viewer))
}

/// Serializes and sends one message. Returns `false` once the client is gone.
async fn send(sender: &mut WsSender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

async fn send_error(sender: &mut WsSender, message: impl Into<String>) -> bool {
    send(sender, &ServerMessage::Error { message: message.into() }).await
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, viewer: Viewer) {
    info!("New editor connection for user: {:?}", viewer.user_id());
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Initialization Phase ---
    let mut session = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { map_id: Some(map_id) }) => {
                info!("Opening map {} for editing", map_id);
                match EditorSession::load(&app_state, &viewer, map_id).await {
                    Ok(session) => session,
                    Err(e) => {
                        error!("Failed to load map {} for editing: {:?}", map_id, e);
                        let _ = send_error(&mut sender, e.to_string()).await;
                        return;
                    }
                }
            }
            Ok(ClientMessage::Init { map_id: None }) => {
                info!("Starting a new draft map");
                EditorSession::new_draft()
            }
            Ok(_) => {
                error!("First message was not an Init message.");
                let _ = send_error(&mut sender, "Expected an init message first").await;
                return;
            }
            Err(e) => {
                error!("Failed to deserialize Init message: {}", e);
                let _ = send_error(&mut sender, "Expected an init message first").await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let initialized = ServerMessage::SessionInitialized { map_id: session.map_id };
    if !send(&mut sender, &initialized).await || !send(&mut sender, &session.snapshot()).await {
        error!("Failed to send session initialized message.");
        return;
    }

    // --- 2. Main Message Loop ---
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket receive error: {:?}", e);
                break;
            }
        };

        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                warn!("Failed to deserialize client message: {}", e);
                if !send_error(&mut sender, format!("Malformed message: {}", e)).await {
                    break;
                }
                continue;
            }
        };

        let delivered = match session.handle(&app_state, &viewer, client_msg).await {
            Ok(Outcome::Updated) => send(&mut sender, &session.snapshot()).await,
            Ok(Outcome::Saved(map_id)) => {
                send(&mut sender, &ServerMessage::Saved { map_id }).await
                    && send(&mut sender, &session.snapshot()).await
            }
            Ok(Outcome::Deleted(map_id)) => {
                let _ = send(&mut sender, &ServerMessage::Deleted { map_id }).await;
                break;
            }
            Err(e) => {
                warn!("Editor rejected message: {}", e);
                send_error(&mut sender, e.to_string()).await
            }
        };

        if !delivered {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    // Unsaved edits are discarded with the session.
    info!("Editor connection closed.");
}
