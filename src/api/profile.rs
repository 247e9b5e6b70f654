use crate::{
    api::auth::AppState,
    auth::AuthUser,
    db::models::Account,
    error::{AppError, Result},
    ws::messages::EntityKind,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Account,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub game_uid: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_my_profile))
        .route("/", put(update_my_profile))
}

async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;
    let profile = load_profile(&state, &auth_user.account_id).await?;
    Ok(Json(profile))
}

async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    if let Some(username) = req.username.as_deref() {
        let username = username.trim();
        if username.len() < 3 || username.len() > 32 {
            return Err(AppError::Validation(
                "Username must be between 3 and 32 characters".to_string(),
            ));
        }

        let taken: Option<(String,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE LOWER(username) = LOWER(?) AND id != ?")
                .bind(username)
                .bind(&auth_user.account_id)
                .fetch_optional(&state.pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::Validation("Username already taken".to_string()));
        }

        sqlx::query("UPDATE accounts SET username = ? WHERE id = ?")
            .bind(username)
            .bind(&auth_user.account_id)
            .execute(&state.pool)
            .await?;
    }

    if let Some(game_uid) = req.game_uid.as_deref() {
        let game_uid = game_uid.trim();
        if game_uid.is_empty() || game_uid.len() > 32 {
            return Err(AppError::Validation(
                "Game UID must be between 1 and 32 characters".to_string(),
            ));
        }

        sqlx::query("UPDATE accounts SET game_uid = ? WHERE id = ?")
            .bind(game_uid)
            .bind(&auth_user.account_id)
            .execute(&state.pool)
            .await?;
    }

    state
        .events
        .publish(EntityKind::Account, &auth_user.account_id);

    let profile = load_profile(&state, &auth_user.account_id).await?;
    Ok(Json(profile))
}

fn auth_user_from_headers(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthUser> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    AuthUser::from_header(&state.jwt_manager, auth_header)
}

async fn load_profile(state: &Arc<AppState>, account_id: &str) -> Result<ProfileResponse> {
    let account: Option<Account> = sqlx::query_as("SELECT * FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(&state.pool)
        .await?;

    let Some(account) = account else {
        return Err(AppError::Auth(
            "Account no longer exists. Please log in again.".to_string(),
        ));
    };

    let balance = state.ledger.balance(account_id).await?;

    Ok(ProfileResponse {
        user: account,
        balance,
    })
}
