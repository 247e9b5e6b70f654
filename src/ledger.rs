//! Append-only token ledger.
//!
//! Balances are never stored; they are the sum of committed entries for an
//! account. Every write path that needs balance-then-debit atomicity runs
//! both steps inside one database transaction.

use crate::{
    constants::MAX_REQUEST_TOKENS,
    db::{
        models::{Account, LedgerEntry, LedgerReason},
        DbPool,
    },
    error::{AppError, Result},
    ws::{messages::EntityKind, EventHub},
};
use sqlx::SqliteConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct LedgerStore {
    pool: DbPool,
    events: Arc<EventHub>,
}

impl LedgerStore {
    pub fn new(pool: DbPool, events: Arc<EventHub>) -> Self {
        Self { pool, events }
    }

    /// Append one entry unconditionally. Callers that need sufficiency must
    /// check balance in the same transaction; this operation only guards
    /// account existence and the nonzero-amount rule.
    pub async fn append(
        &self,
        account_id: &str,
        amount: i64,
        reason: LedgerReason,
        note: Option<String>,
        admin_id: Option<String>,
    ) -> Result<LedgerEntry> {
        if amount == 0 {
            return Err(AppError::Validation(
                "Ledger amount must be nonzero".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        ensure_account_exists(&mut tx, account_id).await?;

        let entry = LedgerEntry::new(account_id.to_string(), amount, reason, note, admin_id);
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;

        self.events.publish(EntityKind::Ledger, account_id);
        Ok(entry)
    }

    /// Admin token grant (positive) or penalty (negative). A penalty may not
    /// push a player balance below zero; the check runs in the same
    /// transaction as the append.
    pub async fn grant(
        &self,
        account_id: &str,
        amount: i64,
        reason: LedgerReason,
        note: Option<String>,
        admin_id: &str,
    ) -> Result<LedgerEntry> {
        if amount == 0 {
            return Err(AppError::Validation(
                "Ledger amount must be nonzero".to_string(),
            ));
        }
        if amount > MAX_REQUEST_TOKENS || amount < -MAX_REQUEST_TOKENS {
            return Err(AppError::Validation(format!(
                "Grant cannot exceed {} tokens",
                MAX_REQUEST_TOKENS
            )));
        }

        let mut tx = self.pool.begin().await?;

        let account = find_account(&mut tx, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        let entry = LedgerEntry::new(
            account_id.to_string(),
            amount,
            reason,
            note,
            Some(admin_id.to_string()),
        );
        insert_entry(&mut tx, &entry).await?;

        if amount < 0 && !account.is_admin() {
            let balance = balance_of(&mut tx, account_id).await?;
            if balance < 0 {
                return Err(AppError::InsufficientFunds(
                    "Penalty exceeds account balance".to_string(),
                ));
            }
        }

        tx.commit().await?;

        crate::audit::log_ledger_append(account_id, admin_id, amount, entry.reason.as_str());
        self.events.publish(EntityKind::Ledger, account_id);
        Ok(entry)
    }

    /// Current balance as a fold over the account's entries. Not meaningful
    /// for admin accounts; callers branch on role before consulting it.
    pub async fn balance(&self, account_id: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        balance_of(&mut conn, account_id).await
    }

    /// Entry history for an account, most recent first, capped so one
    /// long-lived account cannot drag a whole table over the wire.
    pub async fn entries_for(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM ledger_entries WHERE account_id = ?
             ORDER BY created_at DESC, id LIMIT 200",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// ==================== Transaction-level helpers ====================
//
// These run against a caller-owned connection so services can compose them
// with their own statements inside a single transaction.

pub(crate) async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO ledger_entries (id, account_id, amount, reason, note, admin_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.account_id)
    .bind(entry.amount)
    .bind(&entry.reason)
    .bind(&entry.note)
    .bind(&entry.admin_id)
    .bind(&entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn balance_of(conn: &mut SqliteConnection, account_id: &str) -> Result<i64> {
    let (balance,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(balance)
}

pub(crate) async fn find_account(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(account)
}

pub(crate) async fn ensure_account_exists(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> Result<()> {
    find_account(conn, account_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
}
