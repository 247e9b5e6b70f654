//! Structured audit logging for security-relevant events.
//!
//! Every ledger append, tournament transition, and request submission or
//! decision is logged with the audit target for structured output.

/// Log a committed ledger append
pub fn log_ledger_append(account_id: &str, changed_by: &str, amount: i64, reason: &str) {
    tracing::info!(
        target: "audit",
        event = "ledger_append",
        account_id = account_id,
        changed_by = changed_by,
        amount = amount,
        reason = reason,
        "Ledger append: {} ({}) for account {} by {}",
        amount,
        reason,
        account_id,
        changed_by
    );
}

/// Log a tournament event
pub fn log_tournament_event(tournament_id: &str, event: &str, details: &str) {
    tracing::info!(
        target: "audit",
        event = "tournament",
        tournament_id = tournament_id,
        tournament_event = event,
        details = details,
        "Tournament {}: {} - {}",
        tournament_id,
        event,
        details
    );
}

/// Log a newly submitted payment or withdrawal request
pub fn log_request_submitted(kind: &str, request_id: &str, account_id: &str, amount: i64) {
    tracing::info!(
        target: "audit",
        event = "request_submitted",
        request_kind = kind,
        request_id = request_id,
        account_id = account_id,
        amount = amount,
        "Request submitted: {} {} for {} tokens by {}",
        kind,
        request_id,
        amount,
        account_id
    );
}

/// Log a settlement decision on a payment or withdrawal request
pub fn log_request_decision(kind: &str, request_id: &str, admin_id: &str, outcome: &str) {
    tracing::info!(
        target: "audit",
        event = "request_decision",
        request_kind = kind,
        request_id = request_id,
        admin_id = admin_id,
        outcome = outcome,
        "Request decision: {} {} -> {} by {}",
        kind,
        request_id,
        outcome,
        admin_id
    );
}

/// Log an authentication event
pub fn log_auth_event(username: &str, event: &str, success: bool) {
    if success {
        tracing::info!(
            target: "audit",
            event = "auth",
            username = username,
            auth_event = event,
            success = success,
            "Auth: {} - {} (success={})",
            event,
            username,
            success
        );
    } else {
        tracing::warn!(
            target: "audit",
            event = "auth",
            username = username,
            auth_event = event,
            success = success,
            "Auth: {} - {} (success={})",
            event,
            username,
            success
        );
    }
}

/// Log a security event (unauthorized admin access attempts, etc.)
pub fn log_security_event(account_id: &str, event: &str, details: &str) {
    tracing::warn!(
        target: "audit",
        event = "security",
        account_id = account_id,
        security_event = event,
        details = details,
        "Security: {} - {} - {}",
        event,
        account_id,
        details
    );
}
