use crate::{
    api::auth::{require_admin, AppState},
    auth::AuthUser,
    db::models::PaymentRequest,
    error::{AppError, Result},
    requests::{payments::PendingPayment, Decision},
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
pub struct SubmitPaymentRequest {
    pub amount: i64,
    pub screenshot_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub outcome: Decision,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub requests: Vec<PaymentRequest>,
}

#[derive(Debug, Serialize)]
pub struct PendingPaymentsResponse {
    pub requests: Vec<PendingPayment>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit_payment))
        .route("/", get(list_my_payments))
        .route("/pending", get(list_pending_payments))
        .route("/:id/decide", post(decide_payment))
}

async fn submit_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<Json<PaymentRequest>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let request = state
        .payments
        .submit(&auth_user.account_id, req.amount, req.screenshot_ref)
        .await?;
    Ok(Json(request))
}

async fn list_my_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PaymentListResponse>> {
    let auth_user = auth_user_from_headers(&state, &headers)?;

    let requests = state.payments.list_for(&auth_user.account_id).await?;
    Ok(Json(PaymentListResponse { requests }))
}

async fn list_pending_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PendingPaymentsResponse>> {
    require_admin(&state, &headers).await?;

    let requests = state.payments.list_pending().await?;
    Ok(Json(PendingPaymentsResponse { requests }))
}

async fn decide_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DecideRequest>,
) -> Result<Json<PaymentRequest>> {
    let admin = require_admin(&state, &headers).await?;

    let request = state
        .payments
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
