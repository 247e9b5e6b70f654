use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use arena_server::create_test_app;

async fn setup() -> TestServer {
    let (app, _state) = create_test_app().await;
    TestServer::new(app).unwrap()
}

async fn register_user(
    server: &TestServer,
    username: &str,
    email: &str,
) -> (String, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": "password1",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn register_admin(server: &TestServer) -> (String, String) {
    register_user(server, "admin", "admin@example.com").await
}

async fn grant_tokens(server: &TestServer, admin_token: &str, account_id: &str, amount: i64) {
    let response = server
        .post("/api/wallet/grant")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "account_id": account_id,
            "amount": amount,
            "reason": "bonus",
            "note": "top up",
        }))
        .await;
    response.assert_status_ok();
}

async fn balance_of(server: &TestServer, token: &str) -> i64 {
    let response = server
        .get("/api/wallet")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["balance"].as_i64().unwrap()
}

/// Creates a waiting tournament and returns its id.
async fn create_tournament(
    server: &TestServer,
    admin_token: &str,
    entry_fee: i64,
    max_players: i32,
) -> String {
    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Friday Squad Showdown",
            "mode": "squad",
            "entry_fee": entry_fee,
            "kill_reward": 10,
            "booyah_reward": 100,
            "max_players": max_players,
            "scheduled_at": "2026-09-01T18:00:00+00:00",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

async fn join(server: &TestServer, token: &str, tournament_id: &str) -> axum_test::TestResponse {
    server
        .post(&format!("/api/tournaments/{}/join", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
}

// ==================== Creation Tests ====================

#[tokio::test]
async fn test_create_tournament_as_admin() {
    let server = setup().await;
    let (admin_token, admin_id) = register_admin(&server).await;

    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Solo Clash",
            "description": "Weekly 1v1 bracket",
            "mode": "1v1",
            "entry_fee": 25,
            "kill_reward": 5,
            "booyah_reward": 80,
            "max_players": 48,
            "scheduled_at": "2026-09-01T18:00:00+00:00",
            "rules": "No emulators",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Solo Clash");
    assert_eq!(body["mode"], "1v1");
    assert_eq!(body["entry_fee"], 25);
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["joined_count"], 0);
    assert_eq!(body["created_by"].as_str().unwrap(), admin_id);
}

#[tokio::test]
async fn test_create_tournament_forbidden_for_players() {
    let server = setup().await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;

    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({
            "title": "Rogue Bracket",
            "mode": "1v1",
            "entry_fee": 10,
            "max_players": 12,
            "scheduled_at": "2026-09-01T18:00:00+00:00",
        }))
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_create_tournament_unknown_mode_rejected() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;

    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Mystery Mode",
            "mode": "battle_bus",
            "entry_fee": 10,
            "max_players": 12,
            "scheduled_at": "2026-09-01T18:00:00+00:00",
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_create_upcoming_tournament() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;

    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Season Finale Teaser",
            "mode": "squad",
            "entry_fee": 50,
            "max_players": 48,
            "scheduled_at": "2026-12-01T18:00:00+00:00",
            "upcoming": true,
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "upcoming");
}

#[tokio::test]
async fn test_list_shows_join_status() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let joined_id = create_tournament(&server, &admin_token, 0, 12).await;
    create_tournament(&server, &admin_token, 0, 12).await;

    join(&server, &token, &joined_id).await.assert_status_ok();

    let response = server
        .get("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let tournaments = body["tournaments"].as_array().unwrap();
    assert_eq!(tournaments.len(), 2);
    for entry in tournaments {
        let is_joined = entry["is_joined"].as_bool().unwrap();
        if entry["tournament"]["id"].as_str().unwrap() == joined_id {
            assert!(is_joined);
        } else {
            assert!(!is_joined);
        }
    }
}

// ==================== Join Tests ====================

#[tokio::test]
async fn test_join_deducts_entry_fee() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, id) = register_user(&server, "alice", "alice@example.com").await;
    grant_tokens(&server, &admin_token, &id, 50).await;
    let tournament_id = create_tournament(&server, &admin_token, 20, 2).await;

    let response = join(&server, &token, &tournament_id).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["tournament"]["joined_count"], 1);
    assert_eq!(body["tournament"]["status"], "waiting");
    assert_eq!(balance_of(&server, &token).await, 80);

    let response = server
        .get("/api/wallet/ledger")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    let body: Value = response.json();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["amount"], -20);
    assert_eq!(entries[0]["reason"], "tournament_entry");
}

#[tokio::test]
async fn test_join_fills_last_slot() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (alice_token, _) = register_user(&server, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&server, "bob", "bob@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 1).await;

    let response = join(&server, &alice_token, &tournament_id).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tournament"]["status"], "full");

    let response = join(&server, &bob_token, &tournament_id).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_double_join_rejected() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, id) = register_user(&server, "alice", "alice@example.com").await;
    grant_tokens(&server, &admin_token, &id, 50).await;
    let tournament_id = create_tournament(&server, &admin_token, 20, 12).await;

    join(&server, &token, &tournament_id).await.assert_status_ok();
    let response = join(&server, &token, &tournament_id).await;

    response.assert_status(StatusCode::CONFLICT);
    // Charged exactly once
    assert_eq!(balance_of(&server, &token).await, 80);
}

#[tokio::test]
async fn test_join_with_insufficient_balance() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 200, 12).await;

    let response = join(&server, &token, &tournament_id).await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    assert_eq!(balance_of(&server, &token).await, 50);

    let response = server
        .get(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    let body: Value = response.json();
    assert_eq!(body["tournament"]["joined_count"], 0);
    assert!(body["participants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_unknown_tournament() {
    let server = setup().await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;

    let response = join(&server, &token, "no-such-tournament").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_admin_cannot_join() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = join(&server, &admin_token, &tournament_id).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_upcoming_tournament_rejected() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;

    let response = server
        .post("/api/tournaments")
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "Teaser",
            "mode": "1v1",
            "entry_fee": 0,
            "max_players": 24,
            "scheduled_at": "2026-12-01T18:00:00+00:00",
            "upcoming": true,
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let tournament_id = body["id"].as_str().unwrap();

    let response = join(&server, &token, tournament_id).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_after_start_rejected() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = server
        .post(&format!("/api/tournaments/{}/start", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .await;
    response.assert_status_ok();

    let response = join(&server, &token, &tournament_id).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_concurrent_joins_fill_one_slot() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (alice_token, _) = register_user(&server, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&server, "bob", "bob@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 1).await;

    let (alice_response, bob_response) = tokio::join!(
        join(&server, &alice_token, &tournament_id),
        join(&server, &bob_token, &tournament_id),
    );

    let statuses = [alice_response.status_code(), bob_response.status_code()];
    assert!(statuses.contains(&StatusCode::OK));
    assert!(statuses.contains(&StatusCode::CONFLICT));

    let response = server
        .get(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice_token))
        .await;
    let body: Value = response.json();
    assert_eq!(body["tournament"]["joined_count"], 1);
    assert_eq!(body["tournament"]["status"], "full");
}

#[tokio::test]
async fn test_free_tournament_join_skips_ledger() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    join(&server, &token, &tournament_id).await.assert_status_ok();

    assert_eq!(balance_of(&server, &token).await, 50);
    let response = server
        .get("/api/wallet/ledger")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    let body: Value = response.json();
    // Only the welcome bonus; a free join writes nothing
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

// ==================== Lifecycle Tests ====================

#[tokio::test]
async fn test_start_and_complete_flow() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = server
        .post(&format!("/api/tournaments/{}/start", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "live");

    let response = server
        .post(&format!("/api/tournaments/{}/complete", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "results": { "winner": "alice", "booyahs": 1 },
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "completed");
    assert!(body["results"].as_str().unwrap().contains("alice"));

    // Completed is terminal
    let response = server
        .post(&format!("/api/tournaments/{}/start", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_complete_requires_live() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = server
        .post(&format!("/api/tournaments/{}/complete", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_edit_blocked_after_first_join() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = server
        .put(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({ "entry_fee": 10 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entry_fee"], 10);

    join(&server, &token, &tournament_id).await.assert_status_ok();

    let response = server
        .put(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({ "entry_fee": 30 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

// ==================== Room Tests ====================

#[tokio::test]
async fn test_room_hidden_from_non_participants() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (alice_token, _) = register_user(&server, "alice", "alice@example.com").await;
    let (bob_token, _) = register_user(&server, "bob", "bob@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    join(&server, &alice_token, &tournament_id).await.assert_status_ok();

    let response = server
        .put(&format!("/api/tournaments/{}/room", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .json(&json!({
            "room_id": "5523901",
            "room_password": "booyah22",
        }))
        .await;
    response.assert_status_ok();

    // Participant sees the room
    let response = server
        .get(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice_token))
        .await;
    let body: Value = response.json();
    assert_eq!(body["room"]["room_id"], "5523901");
    assert_eq!(body["room"]["room_password"], "booyah22");

    // Outsider does not
    let response = server
        .get(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob_token))
        .await;
    let body: Value = response.json();
    assert!(body["room"].is_null());

    // Admin always does
    let response = server
        .get(&format!("/api/tournaments/{}", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", admin_token))
        .await;
    let body: Value = response.json();
    assert_eq!(body["room"]["room_id"], "5523901");
}

#[tokio::test]
async fn test_set_room_forbidden_for_players() {
    let server = setup().await;
    let (admin_token, _) = register_admin(&server).await;
    let (token, _) = register_user(&server, "alice", "alice@example.com").await;
    let tournament_id = create_tournament(&server, &admin_token, 0, 12).await;

    let response = server
        .put(&format!("/api/tournaments/{}/room", tournament_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "room_id": "5523901" }))
        .await;

    response.assert_status_forbidden();
}
