use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Account Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub game_uid: Option<String>,
    pub created_at: String,
}

impl Account {
    pub fn new(username: String, email: String, password_hash: String, role: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            role,
            game_uid: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

// ============================================================================
// Ledger Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    Deposit,
    Withdrawal,
    TournamentEntry,
    TournamentWin,
    KillReward,
    Bonus,
    Penalty,
}

impl LedgerReason {
    pub fn as_str(&self) -> &str {
        match self {
            LedgerReason::Deposit => "deposit",
            LedgerReason::Withdrawal => "withdrawal",
            LedgerReason::TournamentEntry => "tournament_entry",
            LedgerReason::TournamentWin => "tournament_win",
            LedgerReason::KillReward => "kill_reward",
            LedgerReason::Bonus => "bonus",
            LedgerReason::Penalty => "penalty",
        }
    }
}

impl std::str::FromStr for LedgerReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(LedgerReason::Deposit),
            "withdrawal" => Ok(LedgerReason::Withdrawal),
            "tournament_entry" => Ok(LedgerReason::TournamentEntry),
            "tournament_win" => Ok(LedgerReason::TournamentWin),
            "kill_reward" => Ok(LedgerReason::KillReward),
            "bonus" => Ok(LedgerReason::Bonus),
            "penalty" => Ok(LedgerReason::Penalty),
            _ => Err(()),
        }
    }
}

/// One immutable signed balance change. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: String,
    pub account_id: String,
    pub amount: i64,
    pub reason: String,
    pub note: Option<String>,
    pub admin_id: Option<String>,
    pub created_at: String,
}

impl LedgerEntry {
    pub fn new(
        account_id: String,
        amount: i64,
        reason: LedgerReason,
        note: Option<String>,
        admin_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            amount,
            reason: reason.as_str().to_string(),
            note,
            admin_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

// ============================================================================
// Tournament Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: String,
    pub title: String,
    pub description: String,
    pub mode: String,
    pub entry_fee: i64,
    pub kill_reward: i64,
    pub booyah_reward: i64,
    pub max_players: i32,
    pub joined_count: i32,
    pub status: String,
    pub scheduled_at: String,
    #[serde(skip_serializing)]
    pub room_id: Option<String>,
    #[serde(skip_serializing)]
    pub room_password: Option<String>,
    pub rules: Option<String>,
    pub results: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl Tournament {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        description: String,
        mode: String,
        entry_fee: i64,
        kill_reward: i64,
        booyah_reward: i64,
        max_players: i32,
        scheduled_at: String,
        rules: Option<String>,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            mode,
            entry_fee,
            kill_reward,
            booyah_reward,
            max_players,
            joined_count: 0,
            status: "waiting".to_string(),
            scheduled_at,
            room_id: None,
            room_password: None,
            rules,
            results: None,
            created_by,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TournamentParticipant {
    pub tournament_id: String,
    pub account_id: String,
    pub joined_at: String,
}

impl TournamentParticipant {
    pub fn new(tournament_id: String, account_id: String) -> Self {
        Self {
            tournament_id,
            account_id,
            joined_at: Utc::now().to_rfc3339(),
        }
    }
}

// ============================================================================
// Request Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRequest {
    pub id: String,
    pub account_id: String,
    pub amount: i64,
    pub screenshot_ref: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub processed_by: Option<String>,
    pub submitted_at: String,
    pub processed_at: Option<String>,
}

impl PaymentRequest {
    pub fn new(account_id: String, amount: i64, screenshot_ref: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            amount,
            screenshot_ref,
            status: "pending".to_string(),
            rejection_reason: None,
            processed_by: None,
            submitted_at: Utc::now().to_rfc3339(),
            processed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WithdrawalRequest {
    pub id: String,
    pub account_id: String,
    pub amount: i64,
    pub fee: i64,
    pub net_amount: i64,
    pub destination: String,
    pub method: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub processed_by: Option<String>,
    pub submitted_at: String,
    pub processed_at: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(
        account_id: String,
        amount: i64,
        fee: i64,
        net_amount: i64,
        destination: String,
        method: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            amount,
            fee,
            net_amount,
            destination,
            method,
            status: "pending".to_string(),
            rejection_reason: None,
            processed_by: None,
            submitted_at: Utc::now().to_rfc3339(),
            processed_at: None,
        }
    }
}
