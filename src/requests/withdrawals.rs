//! Withdrawal Request Workflow
//!
//! Tokens are reserved the moment a cash-out is requested: the full amount
//! is debited at submission and credited back if an admin rejects the
//! request. Approval only flips the status; the tokens already left the
//! balance and the external transfer happens manually.

use crate::{
    audit,
    constants::{MAX_REQUEST_TOKENS, MIN_WITHDRAWAL_FEE, MIN_WITHDRAWAL_TOKENS,
        WITHDRAWAL_FEE_PERCENT},
    db::{
        models::{LedgerEntry, LedgerReason, WithdrawalRequest},
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

/// Service fee for cashing out: 2% of the amount, never below 5 tokens
pub fn withdrawal_fee(amount: i64) -> i64 {
    std::cmp::max(amount * WITHDRAWAL_FEE_PERCENT / 100, MIN_WITHDRAWAL_FEE)
}

/// Pending request joined with the requester, for the admin review queue
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PendingWithdrawal {
    pub id: String,
    pub account_id: String,
    pub username: String,
    pub amount: i64,
    pub fee: i64,
    pub net_amount: i64,
    pub destination: String,
    pub method: String,
    pub submitted_at: String,
}

#[derive(Clone)]
pub struct WithdrawalManager {
    pool: DbPool,
    events: Arc<EventHub>,
}

impl WithdrawalManager {
    pub fn new(pool: DbPool, events: Arc<EventHub>) -> Self {
        Self { pool, events }
    }

    /// Submit a cash-out request and reserve the tokens for it
    pub async fn submit(
        &self,
        account_id: &str,
        amount: i64,
        destination: String,
        method: String,
    ) -> Result<WithdrawalRequest> {
        if amount < MIN_WITHDRAWAL_TOKENS {
            return Err(AppError::InsufficientFunds(format!(
                "Minimum withdrawal is {} tokens",
                MIN_WITHDRAWAL_TOKENS
            )));
        }
        if amount > MAX_REQUEST_TOKENS {
            return Err(AppError::Validation(format!(
                "Amount cannot exceed {} tokens per request",
                MAX_REQUEST_TOKENS
            )));
        }
        if destination.trim().is_empty() {
            return Err(AppError::Validation(
                "A destination account number is required".to_string(),
            ));
        }
        if method.trim().is_empty() {
            return Err(AppError::Validation(
                "A payout method is required".to_string(),
            ));
        }

        let fee = withdrawal_fee(amount);
        let request = WithdrawalRequest::new(
            account_id.to_string(),
            amount,
            fee,
            amount - fee,
            destination,
            method,
        );

        let mut tx = self.pool.begin().await?;

        // Insert first so the transaction opens with a write; the balance
        // check below then runs against serialized state and two parallel
        // submissions cannot both reserve the same tokens.
        sqlx::query(
            "INSERT INTO withdrawal_requests
             (id, account_id, amount, fee, net_amount, destination, method, status, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.account_id)
        .bind(request.amount)
        .bind(request.fee)
        .bind(request.net_amount)
        .bind(&request.destination)
        .bind(&request.method)
        .bind(&request.status)
        .bind(&request.submitted_at)
        .execute(&mut *tx)
        .await?;

        let account = ledger::find_account(&mut tx, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        if !account.is_admin() {
            let balance = ledger::balance_of(&mut tx, account_id).await?;
            if balance < amount {
                return Err(AppError::InsufficientFunds(
                    "Requested amount exceeds your balance".to_string(),
                ));
            }
        }

        let entry = LedgerEntry::new(
            account_id.to_string(),
            -amount,
            LedgerReason::Withdrawal,
            Some("Withdrawal Request: reserved".to_string()),
            None,
        );
        ledger::insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;

        audit::log_request_submitted("withdrawal", &request.id, account_id, amount);
        self.events
            .publish(EntityKind::WithdrawalRequest, &request.id);
        self.events.publish(EntityKind::Ledger, account_id);

        Ok(request)
    }

    /// Decide a pending request. Approval is a pure status flip; rejection
    /// releases the reservation taken at submission.
    pub async fn decide(
        &self,
        request_id: &str,
        outcome: Decision,
        admin_id: &str,
        rejection_reason: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let mut tx = self.pool.begin().await?;

        let status = outcome.as_status();
        let reason = match outcome {
            Decision::Approve => None,
            Decision::Reject => rejection_reason,
        };

        let flipped = sqlx::query(
            "UPDATE withdrawal_requests
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
                None => Err(AppError::NotFound(
                    "Withdrawal request not found".to_string(),
                )),
                Some(_) => Err(AppError::InvalidState(
                    "Request already processed".to_string(),
                )),
            };
        }

        let request = find_request(&mut tx, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Withdrawal request not found".to_string()))?;

        if outcome == Decision::Reject {
            let entry = LedgerEntry::new(
                request.account_id.clone(),
                request.amount,
                LedgerReason::Withdrawal,
                Some("Withdrawal Rejected: tokens returned".to_string()),
                Some(admin_id.to_string()),
            );
            ledger::insert_entry(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        audit::log_request_decision("withdrawal", request_id, admin_id, status);
        self.events.publish(EntityKind::WithdrawalRequest, request_id);
        if outcome == Decision::Reject {
            self.events.publish(EntityKind::Ledger, &request.account_id);
        }

        Ok(request)
    }

    /// Every request one account has submitted, newest first
    pub async fn list_for(&self, account_id: &str) -> Result<Vec<WithdrawalRequest>> {
        let requests = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE account_id = ? ORDER BY submitted_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// The admin review queue, oldest claims first
    pub async fn list_pending(&self) -> Result<Vec<PendingWithdrawal>> {
        let requests = sqlx::query_as::<_, PendingWithdrawal>(
            "SELECT wr.id, wr.account_id, a.username, wr.amount, wr.fee, wr.net_amount,
                    wr.destination, wr.method, wr.submitted_at
             FROM withdrawal_requests wr
             JOIN accounts a ON wr.account_id = a.id
             WHERE wr.status = 'pending'
             ORDER BY wr.submitted_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }
}

async fn find_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Option<WithdrawalRequest>> {
    let request =
        sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawal_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(conn)
            .await?;
    Ok(request)
}
