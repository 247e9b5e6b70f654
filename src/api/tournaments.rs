use crate::{
    api::auth::{require_admin, AppState},
    auth::AuthUser,
    db::models::Tournament,
    error::{AppError, Result},
    tournament::{TournamentConfig, TournamentUpdate},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub title: String,
    pub description: Option<String>,
    pub mode: String,
    pub entry_fee: i64,
    pub kill_reward: Option<i64>,
    pub booyah_reward: Option<i64>,
    pub max_players: i32,
    pub scheduled_at: String,
    pub rules: Option<String>,
    pub upcoming: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTournamentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mode: Option<String>,
    pub entry_fee: Option<i64>,
    pub kill_reward: Option<i64>,
    pub booyah_reward: Option<i64>,
    pub max_players: Option<i32>,
    pub scheduled_at: Option<String>,
    pub rules: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoomRequest {
    pub room_id: String,
    pub room_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTournamentRequest {
    pub results: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct TournamentListResponse {
    pub tournaments: Vec<TournamentWithStatus>,
}

#[derive(Debug, Serialize)]
pub struct TournamentWithStatus {
    pub tournament: Tournament,
    pub is_joined: bool,
}

#[derive(Debug, Serialize)]
pub struct TournamentDetailResponse {
    pub tournament: Tournament,
    pub participants: Vec<ParticipantInfo>,
    pub is_joined: bool,
    pub can_join: bool,
    /// Only present for participants and admins once credentials are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomInfo>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ParticipantInfo {
    pub account_id: String,
    pub username: String,
    pub game_uid: Option<String>,
    pub joined_at: String,
}

#[derive(Debug, Serialize)]
pub struct RoomInfo {
    pub room_id: String,
    pub room_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub success: bool,
    pub tournament: Tournament,
}

// ==================== Router ====================

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tournaments))
        .route("/", post(create_tournament))
        .route("/:id", get(get_tournament_detail))
        .route("/:id", put(update_tournament))
        .route("/:id/room", put(set_room))
        .route("/:id/join", post(join_tournament))
        .route("/:id/start", post(start_tournament))
        .route("/:id/complete", post(complete_tournament))
}

// ==================== Handlers ====================

async fn list_tournaments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TournamentListResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let tournaments = state.tournaments.list().await?;

    let mut with_status = Vec::with_capacity(tournaments.len());
    for tournament in tournaments {
        let is_joined = state
            .tournaments
            .is_participant(&tournament.id, &auth_user.account_id)
            .await?;
        with_status.push(TournamentWithStatus {
            tournament,
            is_joined,
        });
    }

    Ok(Json(TournamentListResponse {
        tournaments: with_status,
    }))
}

async fn create_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTournamentRequest>,
) -> Result<Json<Tournament>> {
    let admin = require_admin(&state, &headers).await?;

    let config = TournamentConfig {
        title: req.title,
        description: req.description.unwrap_or_default(),
        mode: req.mode,
        entry_fee: req.entry_fee,
        kill_reward: req.kill_reward.unwrap_or(0),
        booyah_reward: req.booyah_reward.unwrap_or(0),
        max_players: req.max_players,
        scheduled_at: req.scheduled_at,
        rules: req.rules,
        upcoming: req.upcoming.unwrap_or(false),
    };

    let tournament = state.tournaments.create(&admin.account_id, config).await?;
    Ok(Json(tournament))
}

async fn get_tournament_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TournamentDetailResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let tournament = state.tournaments.get(&id).await?;

    let participants: Vec<ParticipantInfo> = sqlx::query_as(
        "SELECT tp.account_id, a.username, a.game_uid, tp.joined_at
         FROM tournament_participants tp
         JOIN accounts a ON tp.account_id = a.id
         WHERE tp.tournament_id = ?
         ORDER BY tp.joined_at",
    )
    .bind(&id)
    .fetch_all(&state.pool)
    .await?;

    let is_joined = participants
        .iter()
        .any(|p| p.account_id == auth_user.account_id);
    let is_admin = auth_user.role == "admin";

    let room = if is_joined || is_admin {
        tournament.room_id.clone().map(|room_id| RoomInfo {
            room_id,
            room_password: tournament.room_password.clone(),
        })
    } else {
        None
    };

    let can_join = !is_joined && !is_admin && can_join_tournament(&tournament);

    Ok(Json(TournamentDetailResponse {
        tournament,
        participants,
        is_joined,
        can_join,
        room,
    }))
}

async fn update_tournament(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateTournamentRequest>,
) -> Result<Json<Tournament>> {
    require_admin(&state, &headers).await?;

    let changes = TournamentUpdate {
        title: req.title,
        description: req.description,
        mode: req.mode,
        entry_fee: req.entry_fee,
        kill_reward: req.kill_reward,
        booyah_reward: req.booyah_reward,
        max_players: req.max_players,
        scheduled_at: req.scheduled_at,
        rules: req.rules,
        status: req.status,
    };

    let tournament = state.tournaments.update(&id, changes).await?;
    Ok(Json(tournament))
}

async fn set_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRoomRequest>,
) -> Result<Json<Tournament>> {
    require_admin(&state, &headers).await?;

    let tournament = state
        .tournaments
        .set_room(&id, req.room_id, req.room_password)
        .await?;
    Ok(Json(tournament))
}

async fn join_tournament(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JoinResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let tournament = state.tournaments.join(&auth_user.account_id, &id).await?;

    Ok(Json(JoinResponse {
        success: true,
        tournament,
    }))
}

async fn start_tournament(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Tournament>> {
    require_admin(&state, &headers).await?;

    let tournament = state.tournaments.start(&id).await?;
    Ok(Json(tournament))
}

async fn complete_tournament(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CompleteTournamentRequest>,
) -> Result<Json<Tournament>> {
    require_admin(&state, &headers).await?;

    let results = req.results.map(|v| v.to_string());
    let tournament = state.tournaments.complete(&id, results).await?;
    Ok(Json(tournament))
}

// ==================== Helper Functions ====================

fn auth_user_from_headers(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthUser> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    AuthUser::from_header(&state.jwt_manager, auth_header)
}

fn can_join_tournament(tournament: &Tournament) -> bool {
    tournament.status == "waiting" && tournament.joined_count < tournament.max_players
}
