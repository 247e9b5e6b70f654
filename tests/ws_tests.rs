use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use arena_server::create_test_app;
use arena_server::ws::messages::{ClientMessage, EntityKind, ServerMessage};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let (app, _state) = create_test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Registers an account over HTTP and returns (token, account_id).
async fn register_http(addr: SocketAddr, username: &str, email: &str) -> (String, String) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/auth/register", addr))
        .json(&json!({
            "username": username,
            "email": email,
            "password": "password1",
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn connect_ws(addr: SocketAddr, token: &str) -> WsClient {
    let url = format!("ws://{}/ws?token={}", addr, token);
    let (ws, _) = connect_async(&url).await.expect("websocket connect failed");
    ws
}

/// Reads frames until the next text message, skipping protocol pings.
async fn next_server_message(ws: &mut WsClient) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a server message")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("unparseable server message");
        }
    }
}

/// Ping/pong round trip. Once the pong is back the server's event loop
/// is provably running, so a change published after this cannot be missed.
async fn ping_pong(ws: &mut WsClient) {
    let ping = serde_json::to_string(&ClientMessage::Ping).unwrap();
    ws.send(Message::Text(ping)).await.unwrap();
    loop {
        match next_server_message(ws).await {
            ServerMessage::Pong => return,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_ws_connect_receives_connected_message() {
    let addr = spawn_server().await;
    let (token, _) = register_http(addr, "alice", "alice@example.com").await;

    let mut ws = connect_ws(addr, &token).await;

    let msg = next_server_message(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Connected));
}

#[tokio::test]
async fn test_ws_rejects_invalid_token() {
    let addr = spawn_server().await;

    let url = format!("ws://{}/ws?token=not-a-real-token", addr);
    let result = connect_async(&url).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let addr = spawn_server().await;
    let (token, _) = register_http(addr, "alice", "alice@example.com").await;
    let mut ws = connect_ws(addr, &token).await;

    let msg = next_server_message(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Connected));

    let ping = serde_json::to_string(&ClientMessage::Ping).unwrap();
    ws.send(Message::Text(ping)).await.unwrap();

    let msg = next_server_message(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Pong));
}

#[tokio::test]
async fn test_ws_forwards_ledger_changes() {
    let addr = spawn_server().await;
    let (admin_token, _) = register_http(addr, "admin", "admin@example.com").await;
    let (token, player_id) = register_http(addr, "alice", "alice@example.com").await;

    let mut ws = connect_ws(addr, &token).await;
    let msg = next_server_message(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Connected));
    ping_pong(&mut ws).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/wallet/grant", addr))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "account_id": player_id,
            "amount": 100,
            "reason": "kill_reward",
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let msg = next_server_message(&mut ws).await;
    match msg {
        ServerMessage::EntityChanged { kind, id } => {
            assert_eq!(kind, EntityKind::Ledger);
            assert_eq!(id, player_id);
        }
        other => panic!("expected an entity change, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_forwards_tournament_changes() {
    let addr = spawn_server().await;
    let (admin_token, _) = register_http(addr, "admin", "admin@example.com").await;
    let (token, _) = register_http(addr, "alice", "alice@example.com").await;

    let mut ws = connect_ws(addr, &token).await;
    let msg = next_server_message(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Connected));
    ping_pong(&mut ws).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/tournaments", addr))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Night Scrims",
            "mode": "squad",
            "entry_fee": 10,
            "max_players": 48,
            "scheduled_at": "2026-09-01T18:00:00+00:00",
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    let tournament_id = body["id"].as_str().unwrap();

    let msg = next_server_message(&mut ws).await;
    match msg {
        ServerMessage::EntityChanged { kind, id } => {
            assert_eq!(kind, EntityKind::Tournament);
            assert_eq!(id, tournament_id);
        }
        other => panic!("expected an entity change, got {:?}", other),
    }
}
