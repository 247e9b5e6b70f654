use crate::{
    api::auth::{require_admin, AppState},
    auth::AuthUser,
    db::models::WithdrawalRequest,
    error::{AppError, Result},
    requests::{withdrawals::PendingWithdrawal, Decision},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SubmitWithdrawalRequest {
    pub amount: i64,
    pub destination: String,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub outcome: Decision,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalListResponse {
    pub requests: Vec<WithdrawalRequest>,
}

#[derive(Debug, Serialize)]
pub struct PendingWithdrawalsResponse {
    pub requests: Vec<PendingWithdrawal>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit_withdrawal))
        .route("/", get(list_my_withdrawals))
        .route("/pending", get(list_pending_withdrawals))
        .route("/:id/decide", post(decide_withdrawal))
}

async fn submit_withdrawal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitWithdrawalRequest>,
) -> Result<Json<WithdrawalRequest>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let request = state
        .withdrawals
        .submit(
            &auth_user.account_id,
            req.amount,
            req.destination,
            req.method,
        )
        .await?;
    Ok(Json(request))
}

async fn list_my_withdrawals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<WithdrawalListResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let requests = state.withdrawals.list_for(&auth_user.account_id).await?;
    Ok(Json(WithdrawalListResponse { requests }))
}

async fn list_pending_withdrawals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PendingWithdrawalsResponse>> {
    require_admin(&state, &headers).await?;

    let requests = state.withdrawals.list_pending().await?;
    Ok(Json(PendingWithdrawalsResponse { requests }))
}

async fn decide_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DecideRequest>,
) -> Result<Json<WithdrawalRequest>> {
    let admin = require_admin(&state, &headers).await?;

    let request = state
        .withdrawals
        .decide(&id, req.outcome, &admin.account_id, req.rejection_reason)
        .await?;
    Ok(Json(request))
}

fn auth_user_from_headers(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthUser> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    AuthUser::from_header(&state.jwt_manager, auth_header)
}
