use crate::ws::{
    hub::EventHub,
    messages::{ClientMessage, ServerMessage},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(hub): State<Arc<EventHub>>,
) -> Response {
    // Verify JWT token
    let claims = match hub.jwt_manager.verify_token(&query.token) {
        Ok(claims) => claims,
        Err(_) => {
            return (axum::http::StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    let token_expires_at = DateTime::from_timestamp(claims.exp as i64, 0)
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

    ws.max_message_size(8 * 1024) // 8KB max message size
        .on_upgrade(move |socket| handle_socket(socket, claims.sub, hub, token_expires_at))
}

async fn handle_socket(
    socket: WebSocket,
    account_id: String,
    hub: Arc<EventHub>,
    token_expires_at: DateTime<Utc>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Send connected message
    if let Ok(json) = serde_json::to_string(&ServerMessage::Connected) {
        let _ = sender.send(Message::Text(json)).await;
    }

    let mut changes_rx = hub.subscribe();
    let mut token_check_interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
    let mut ping_interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
    let mut last_pong = tokio::time::Instant::now();

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                            let response = match client_msg {
                                ClientMessage::Ping => ServerMessage::Pong,
                            };
                            if let Ok(response_text) = serde_json::to_string(&response) {
                                let _ = sender.send(Message::Text(response_text)).await;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("WebSocket closed for account {}", account_id);
                        break;
                    }
                    _ => {}
                }
            }

            // Server-side heartbeat: ping every 30 seconds, drop silent connections
            _ = ping_interval.tick() => {
                if last_pong.elapsed() > tokio::time::Duration::from_secs(40) {
                    tracing::warn!("No pong from account {} in 40s, closing connection", account_id);
                    break;
                }
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }

            // Periodic token expiry check
            _ = token_check_interval.tick() => {
                if Utc::now() >= token_expires_at {
                    let err = ServerMessage::Error {
                        message: "Token expired, please reconnect".to_string(),
                    };
                    if let Ok(err_text) = serde_json::to_string(&err) {
                        let _ = sender.send(Message::Text(err_text)).await;
                    }
                    break;
                }
            }

            // Forward entity change notifications
            change = changes_rx.recv() => {
                match change {
                    Ok(msg) => {
                        if let Ok(msg_text) = serde_json::to_string(&msg) {
                            let _ = sender.send(Message::Text(msg_text)).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Change feed for account {} lagged, skipped {} events",
                            account_id,
                            skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
