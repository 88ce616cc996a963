//! WebSocket route: upgrade, message loop, cleanup.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::messages::{msg_types, system, ClientMessage, ServerMessage};
use super::repository::{mark_read, unread_count};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/ws?user_id=
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    debug!("WebSocket upgrade for user {}", query.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, query.user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    let hub = state.notifications.hub().clone();
    let (connection_id, outgoing_rx) = hub.register(user_id).await;

    let unread = unread_count(&state.db, user_id).await.unwrap_or_else(|e| {
        warn!("Could not count unread notifications for {user_id}: {e}");
        0
    });
    let connected = ServerMessage::new(
        msg_types::CONNECTED,
        system::Connected {
            connection_id,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            unread_count: unread,
        },
    );

    let (ws_sink, ws_stream) = socket.split();
    let outgoing = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx, connected));

    process_incoming(ws_stream, user_id, connection_id, &state).await;

    debug!("WebSocket disconnected: user {user_id} connection {connection_id}");
    outgoing.abort();
    hub.unregister(user_id, connection_id).await;
}

async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
    initial: ServerMessage,
) {
    if let Ok(json) = serde_json::to_string(&initial) {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    while let Some(msg) = outgoing_rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            Err(e) => error!("Failed to serialize WebSocket message: {e}"),
        }
    }
}

async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    user_id: Uuid,
    connection_id: Uuid,
    state: &AppState,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = reply_to_frame(user_id, &text, state).await {
                    state
                        .notifications
                        .hub()
                        .send_to_connection(user_id, connection_id, reply)
                        .await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error for user {user_id}: {e}");
                break;
            }
        }
    }
}

/// Parses one text frame and handles it. Unparseable frames get a `parse_error`.
async fn reply_to_frame(user_id: Uuid, text: &str, state: &AppState) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_client_message(user_id, msg, state).await,
        Err(e) => Some(error_message(
            "parse_error",
            format!("Invalid message format: {e}"),
        )),
    }
}

/// Handles one client message; the returned message goes back to the sender only.
async fn handle_client_message(
    user_id: Uuid,
    msg: ClientMessage,
    state: &AppState,
) -> Option<ServerMessage> {
    match msg.msg_type.as_str() {
        msg_types::PING => Some(ServerMessage::empty(msg_types::PONG)),
        msg_types::MARK_READ => {
            let request: system::MarkRead = match serde_json::from_value(msg.payload) {
                Ok(r) => r,
                Err(e) => return Some(error_message("invalid_payload", e.to_string())),
            };
            match mark_read(&state.db, user_id, request.notification_id).await {
                Ok(Some(_)) => {
                    state
                        .notifications
                        .push(
                            user_id,
                            ServerMessage::new(
                                msg_types::NOTIFICATION_READ,
                                system::NotificationRead {
                                    notification_id: Some(request.notification_id),
                                    all: false,
                                },
                            ),
                        )
                        .await;
                    None
                }
                Ok(None) => Some(error_message(
                    "not_found",
                    format!("Notification {} not found", request.notification_id),
                )),
                Err(e) => {
                    error!("mark_read failed for user {user_id}: {e:?}");
                    Some(error_message("internal", "Could not update notification"))
                }
            }
        }
        other => Some(error_message(
            "unknown_type",
            format!("Unknown message type '{other}'"),
        )),
    }
}

fn error_message(code: &str, message: impl Into<String>) -> ServerMessage {
    ServerMessage::new(msg_types::ERROR, system::Error::new(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::offline_state;

    fn error_code(reply: &ServerMessage) -> &str {
        assert_eq!(reply.msg_type, msg_types::ERROR);
        reply.payload["code"].as_str().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let state = offline_state();
        let reply = reply_to_frame(Uuid::new_v4(), r#"{"type":"ping"}"#, &state)
            .await
            .unwrap();
        assert_eq!(reply, ServerMessage::empty(msg_types::PONG));
    }

    #[tokio::test]
    async fn test_unknown_type_gets_error() {
        let state = offline_state();
        let reply = reply_to_frame(Uuid::new_v4(), r#"{"type":"subscribe","payload":{}}"#, &state)
            .await
            .unwrap();
        assert_eq!(error_code(&reply), "unknown_type");
        assert!(reply.payload["message"].as_str().unwrap().contains("subscribe"));
    }

    #[tokio::test]
    async fn test_unparseable_frame_gets_parse_error() {
        let state = offline_state();
        for frame in ["not json", r#"{"payload":{}}"#] {
            let reply = reply_to_frame(Uuid::new_v4(), frame, &state).await.unwrap();
            assert_eq!(error_code(&reply), "parse_error", "{frame}");
        }
    }

    #[tokio::test]
    async fn test_mark_read_without_id_is_invalid_payload() {
        let state = offline_state();
        let msg = ClientMessage {
            msg_type: msg_types::MARK_READ.to_string(),
            payload: serde_json::json!({ "notification_id": "nope" }),
        };
        let reply = handle_client_message(Uuid::new_v4(), msg, &state)
            .await
            .unwrap();
        assert_eq!(error_code(&reply), "invalid_payload");
    }
}
