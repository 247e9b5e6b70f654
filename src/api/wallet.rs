use crate::{
    api::auth::{require_admin, AppState},
    auth::AuthUser,
    db::models::{LedgerEntry, LedgerReason},
    error::{AppError, Result},
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub account_id: String,
    pub amount: i64,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GrantResponse {
    pub entry: LedgerEntry,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_balance))
        .route("/ledger", get(get_ledger))
        .route("/grant", post(grant_tokens))
}

async fn get_balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BalanceResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;
    let balance = state.ledger.balance(&auth_user.account_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

async fn get_ledger(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LedgerResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;
    let entries = state.ledger.entries_for(&auth_user.account_id).await?;
    Ok(Json(LedgerResponse { entries }))
}

/// Admin-only: credit or debit any account directly. This is how kill
/// rewards, booyah prizes and manual corrections reach player balances.
async fn grant_tokens(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<GrantRequest>,
) -> Result<Json<GrantResponse>> {
    let admin = require_admin(&state, &headers).await?;

    let reason: LedgerReason = req
        .reason
        .parse()
        .map_err(|_| AppError::Validation(format!("Unknown ledger reason '{}'", req.reason)))?;

    let entry = state
        .ledger
        .grant(
            &req.account_id,
            req.amount,
            reason,
            req.note,
            &admin.account_id,
        )
        .await?;

    Ok(Json(GrantResponse { entry }))
}

fn auth_user_from_headers(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthUser> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    AuthUser::from_header(&state.jwt_manager, auth_header)
}
