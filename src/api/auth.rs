use crate::{
    audit,
    auth::{AuthUser, JwtManager},
    constants::STARTING_GRANT_TOKENS,
    db::{
        models::{Account, LedgerEntry, LedgerReason},
        DbPool,
    },
    error::{AppError, Result},
    ledger::LedgerStore,
    requests::{PaymentManager, WithdrawalManager},
    tournament::TournamentManager,
    ws::EventHub,
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Account,
}

pub struct AppState {
    pub pool: DbPool,
    pub jwt_manager: Arc<JwtManager>,
    pub events: Arc<EventHub>,
    pub ledger: LedgerStore,
    pub tournaments: TournamentManager,
    pub payments: PaymentManager,
    pub withdrawals: WithdrawalManager,
    /// Emails that register straight into the admin role
    pub admin_emails: Vec<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    // Validate input
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(AppError::Validation(
            "Username must be between 3 and 32 characters".to_string(),
        ));
    }

    if !req.email.contains('@') {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }

    if let Err(msg) = validate_password(&req.password) {
        return Err(AppError::Validation(msg));
    }

    // Check if username or email already exists (case-insensitive)
    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT id FROM accounts WHERE LOWER(username) = LOWER(?) OR LOWER(email) = LOWER(?)",
    )
    .bind(&req.username)
    .bind(&req.email)
    .fetch_optional(&state.pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::Validation(
            "Username or email already exists".to_string(),
        ));
    }

    // Hash password
    let password_hash = bcrypt::hash(req.password.as_bytes(), bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;

    let role = if state
        .admin_emails
        .iter()
        .any(|admin| admin.eq_ignore_ascii_case(&req.email))
    {
        "admin"
    } else {
        "player"
    };

    let account = Account::new(req.username, req.email, password_hash, role.to_string());

    // Account row and starting grant commit together, so every player
    // account always has its welcome tokens on the ledger.
    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO accounts (id, username, email, password_hash, role, game_uid, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&account.id)
    .bind(&account.username)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.role)
    .bind(&account.game_uid)
    .bind(&account.created_at)
    .execute(&mut *tx)
    .await?;

    let grant = LedgerEntry::new(
        account.id.clone(),
        STARTING_GRANT_TOKENS,
        LedgerReason::Bonus,
        Some("Welcome bonus".to_string()),
        None,
    );
    crate::ledger::insert_entry(&mut tx, &grant).await?;

    tx.commit().await?;

    audit::log_auth_event(&account.username, "register", true);

    // Generate JWT token
    let token = state.jwt_manager.create_token(
        account.id.clone(),
        account.username.clone(),
        account.role.clone(),
    )?;

    Ok(Json(AuthResponse {
        token,
        user: account,
    }))
}

/// Dummy hash for timing-safe comparison when the email is not found.
/// Kept valid so that bcrypt::verify takes similar time as a real check.
const DUMMY_HASH: &str = "$2b$12$hNRccWFEMOAb.KzeLJ3m4ys3Lg2VBe.LBsDMzuCdNhJFUJShHTzu/";

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    // Find account by email (case-insensitive)
    let account: Option<Account> =
        sqlx::query_as("SELECT * FROM accounts WHERE LOWER(email) = LOWER(?)")
            .bind(&req.email)
            .fetch_optional(&state.pool)
            .await?;

    // Timing-safe: always perform bcrypt::verify even when the email is unknown
    let (account, valid) = match account {
        Some(a) => {
            let ok = bcrypt::verify(req.password.as_bytes(), &a.password_hash).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to verify password: {}", e))
            })?;
            (Some(a), ok)
        }
        None => {
            let _ = bcrypt::verify(req.password.as_bytes(), DUMMY_HASH);
            (None, false)
        }
    };

    if !valid {
        audit::log_auth_event(&req.email, "login_failed", false);
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    let account = account.unwrap(); // Safe: valid=true means account is Some

    audit::log_auth_event(&account.username, "login", true);

    let token = state.jwt_manager.create_token(
        account.id.clone(),
        account.username.clone(),
        account.role.clone(),
    )?;

    Ok(Json(AuthResponse {
        token,
        user: account,
    }))
}

/// Authenticate the caller and verify the admin role against the database,
/// so a stale token from a demoted admin stops working immediately.
pub(crate) async fn require_admin(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthUser> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let auth_user = AuthUser::from_header(&state.jwt_manager, auth_header)?;

    let role: Option<(String,)> = sqlx::query_as("SELECT role FROM accounts WHERE id = ?")
        .bind(&auth_user.account_id)
        .fetch_optional(&state.pool)
        .await?;

    match role {
        Some((role,)) if role == "admin" => Ok(auth_user),
        Some(_) => {
            audit::log_security_event(
                &auth_user.account_id,
                "admin_route_denied",
                "caller is not an admin",
            );
            Err(AppError::Forbidden)
        }
        None => Err(AppError::Unauthorized),
    }
}

/// Validate password meets the platform requirements.
fn validate_password(password: &str) -> std::result::Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 72 {
        return Err("Password must be at most 72 characters".to_string());
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err("Password must contain at least one letter and one digit".to_string());
    }
    Ok(())
}
