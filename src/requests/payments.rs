//! Payment Request Workflow
//!
//! Players claim they transferred real currency (screenshot as proof) and
//! an admin verifies the claim before any tokens are credited. Submission
//! never touches the ledger.

use crate::{
    audit,
    constants::MAX_REQUEST_TOKENS,
    db::{
        models::{LedgerEntry, LedgerReason, PaymentRequest},
        DbPool,
    },
    error::{AppError, Result},
    ledger,
    ws::{messages::EntityKind, EventHub},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::sync::Arc;

use super::Decision;

/// Pending request joined with the requester, for the admin review queue
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PendingPayment {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub amount: i64,
    pub screenshot_ref: String,
    pub submitted_at: String,
}

#[derive(Clone)]
pub struct PaymentManager {
    pool: DbPool,
    events: Arc<EventHub>,
}

impl PaymentManager {
    pub fn new(pool: DbPool, events: Arc<EventHub>) -> Self {
        Self { pool, events }
    }

    /// Submit a purchase claim for admin review
    pub async fn submit(
        &self,
        account_id: &str,
        amount: i64,
        screenshot_ref: String,
    ) -> Result<PaymentRequest> {
        if amount <= 0 {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }
        if amount > MAX_REQUEST_TOKENS {
            return Err(AppError::Validation(format!(
                "Amount cannot exceed {} tokens per request",
                MAX_REQUEST_TOKENS
            )));
        }
        if screenshot_ref.trim().is_empty() {
            return Err(AppError::Validation(
                "A payment screenshot is required".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await?;
        ledger::ensure_account_exists(&mut conn, account_id).await?;

        let request = PaymentRequest::new(account_id.to_string(), amount, screenshot_ref);
        sqlx::query(
            "INSERT INTO payment_requests
             (id, account_id, amount, screenshot_ref, status, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.account_id)
        .bind(request.amount)
        .bind(&request.screenshot_ref)
        .bind(&request.status)
        .bind(&request.submitted_at)
        .execute(&mut *conn)
        .await?;

        audit::log_request_submitted("payment", &request.id, account_id, amount);
        self.events.publish(EntityKind::PaymentRequest, &request.id);

        Ok(request)
    }

    /// Decide a pending request. Decisions are terminal: retrying an
    /// already processed request fails without a second ledger credit.
    pub async fn decide(
        &self,
        request_id: &str,
        outcome: Decision,
        admin_id: &str,
        rejection_reason: Option<String>,
    ) -> Result<PaymentRequest> {
        let mut tx = self.pool.begin().await?;

        let status = outcome.as_status();
        let reason = match outcome {
            Decision::Approve => None,
            Decision::Reject => rejection_reason,
        };

        // The guarded flip runs first. Of any number of concurrent
        // decisions, exactly one moves the row out of pending.
        let flipped = sqlx::query(
            "UPDATE payment_requests
             SET status = ?, rejection_reason = ?, processed_by = ?, processed_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(&reason)
        .bind(admin_id)
        .bind(Utc::now().to_rfc3339())
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            return match find_request(&mut tx, request_id).await? {
                None => Err(AppError::NotFound("Payment request not found".to_string())),
                Some(_) => Err(AppError::InvalidState(
                    "Request already processed".to_string(),
                )),
            };
        }

        let request = find_request(&mut tx, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment request not found".to_string()))?;

        // Credit and status flip commit together. A failed credit rolls
        // the flip back and the request stays pending.
        if outcome == Decision::Approve {
            let entry = LedgerEntry::new(
                request.account_id.clone(),
                request.amount,
                LedgerReason::Deposit,
                Some("Payment Approved".to_string()),
                Some(admin_id.to_string()),
            );
            ledger::insert_entry(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        audit::log_request_decision("payment", request_id, admin_id, status);
        self.events.publish(EntityKind::PaymentRequest, request_id);
        if outcome == Decision::Approve {
            self.events.publish(EntityKind::Ledger, &request.account_id);
        }

        Ok(request)
    }

    /// Every request one account has submitted, newest first
    pub async fn list_for(&self, account_id: &str) -> Result<Vec<PaymentRequest>> {
        let requests = sqlx::query_as::<_, PaymentRequest>(
            "SELECT * FROM payment_requests WHERE account_id = ? ORDER BY submitted_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// The admin review queue, oldest claims first
    pub async fn list_pending(&self) -> Result<Vec<PendingPayment>> {
        let requests = sqlx::query_as::<_, PendingPayment>(
            "SELECT pr.id, pr.account_id, a.username, pr.amount, pr.screenshot_ref, pr.submitted_at
             FROM payment_requests pr
             JOIN accounts a ON pr.account_id = a.id
             WHERE pr.status = 'pending'
             ORDER BY pr.submitted_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }
}

async fn find_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Option<PaymentRequest>> {
    let request =
        sqlx::query_as::<_, PaymentRequest>("SELECT * FROM payment_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(conn)
            .await?;
    Ok(request)
}
