//! Tournament Manager
//!
//! Centralized management for the tournament lifecycle:
//! - Creating and editing tournaments
//! - Joining (delegated to the participation service)
//! - Publishing custom room credentials
//! - Starting tournaments and recording results

use crate::{
    audit,
    constants::TOURNAMENT_MODES,
    db::models::Tournament,
    error::{AppError, Result},
    tournament::{registration::ParticipationService, store::TournamentStore},
    ws::messages::EntityKind,
};
use chrono::DateTime;

/// Configuration for scheduling a new tournament
#[derive(Debug, Clone)]
pub struct TournamentConfig {
    pub title: String,
    pub description: String,
    pub mode: String,
    pub entry_fee: i64,
    pub kill_reward: i64,
    pub booyah_reward: i64,
    pub max_players: i32,
    pub scheduled_at: String,
    pub rules: Option<String>,
    /// Announce only: the tournament is listed but never accepts joins.
    pub upcoming: bool,
}

/// Partial update for a tournament that has not accepted any players yet
#[derive(Debug, Clone, Default)]
pub struct TournamentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mode: Option<String>,
    pub entry_fee: Option<i64>,
    pub kill_reward: Option<i64>,
    pub booyah_reward: Option<i64>,
    pub max_players: Option<i32>,
    pub scheduled_at: Option<String>,
    pub rules: Option<String>,
    pub status: Option<String>,
}

/// Manages the tournament catalogue and lifecycle
pub struct TournamentManager {
    store: TournamentStore,
    participation: ParticipationService,
}

impl TournamentManager {
    pub fn new(store: TournamentStore) -> Self {
        let participation = ParticipationService::new(store.clone());
        Self {
            store,
            participation,
        }
    }

    /// Schedule a new tournament
    pub async fn create(&self, admin_id: &str, config: TournamentConfig) -> Result<Tournament> {
        if config.title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        validate_mode(&config.mode)?;
        validate_schedule(&config.scheduled_at)?;
        if config.entry_fee < 0 || config.kill_reward < 0 || config.booyah_reward < 0 {
            return Err(AppError::Validation(
                "Token amounts must be non-negative".to_string(),
            ));
        }
        if config.max_players <= 0 {
            return Err(AppError::Validation(
                "Max players must be positive".to_string(),
            ));
        }

        let mut tournament = Tournament::new(
            config.title,
            config.description,
            config.mode,
            config.entry_fee,
            config.kill_reward,
            config.booyah_reward,
            config.max_players,
            config.scheduled_at,
            config.rules,
            admin_id.to_string(),
        );
        if config.upcoming {
            tournament.status = "upcoming".to_string();
        }

        self.store.save(&tournament).await?;

        audit::log_tournament_event(&tournament.id, "created", &tournament.title);
        self.store
            .events
            .publish(EntityKind::Tournament, &tournament.id);

        tracing::info!(
            "Created tournament: {} ({})",
            tournament.title,
            tournament.id
        );
        Ok(tournament)
    }

    /// Edit a tournament. Only allowed while it is still waiting or upcoming
    /// and nobody has joined, so no entry fee ever changes under a player.
    pub async fn update(
        &self,
        tournament_id: &str,
        changes: TournamentUpdate,
    ) -> Result<Tournament> {
        let mut tournament = self.store.load(tournament_id).await?;

        if !matches!(tournament.status.as_str(), "waiting" | "upcoming")
            || tournament.joined_count > 0
        {
            return Err(AppError::InvalidState(
                "Tournament can no longer be edited".to_string(),
            ));
        }

        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Title cannot be empty".to_string()));
            }
            tournament.title = title;
        }
        if let Some(description) = changes.description {
            tournament.description = description;
        }
        if let Some(mode) = changes.mode {
            validate_mode(&mode)?;
            tournament.mode = mode;
        }
        if let Some(entry_fee) = changes.entry_fee {
            if entry_fee < 0 {
                return Err(AppError::Validation(
                    "Entry fee must be non-negative".to_string(),
                ));
            }
            tournament.entry_fee = entry_fee;
        }
        if let Some(kill_reward) = changes.kill_reward {
            if kill_reward < 0 {
                return Err(AppError::Validation(
                    "Kill reward must be non-negative".to_string(),
                ));
            }
            tournament.kill_reward = kill_reward;
        }
        if let Some(booyah_reward) = changes.booyah_reward {
            if booyah_reward < 0 {
                return Err(AppError::Validation(
                    "Booyah reward must be non-negative".to_string(),
                ));
            }
            tournament.booyah_reward = booyah_reward;
        }
        if let Some(max_players) = changes.max_players {
            if max_players <= 0 {
                return Err(AppError::Validation(
                    "Max players must be positive".to_string(),
                ));
            }
            tournament.max_players = max_players;
        }
        if let Some(scheduled_at) = changes.scheduled_at {
            validate_schedule(&scheduled_at)?;
            tournament.scheduled_at = scheduled_at;
        }
        if let Some(rules) = changes.rules {
            tournament.rules = Some(rules);
        }
        if let Some(status) = changes.status {
            if !matches!(status.as_str(), "waiting" | "upcoming") {
                return Err(AppError::Validation(
                    "Status can only be changed between waiting and upcoming".to_string(),
                ));
            }
            tournament.status = status;
        }

        // The guard repeats the editability check so a join that lands
        // between the load above and this write makes the edit lose.
        let updated = sqlx::query(
            "UPDATE tournaments
             SET title = ?, description = ?, mode = ?, entry_fee = ?, kill_reward = ?,
                 booyah_reward = ?, max_players = ?, scheduled_at = ?, rules = ?, status = ?
             WHERE id = ? AND status IN ('waiting', 'upcoming') AND joined_count = 0",
        )
        .bind(&tournament.title)
        .bind(&tournament.description)
        .bind(&tournament.mode)
        .bind(tournament.entry_fee)
        .bind(tournament.kill_reward)
        .bind(tournament.booyah_reward)
        .bind(tournament.max_players)
        .bind(&tournament.scheduled_at)
        .bind(&tournament.rules)
        .bind(&tournament.status)
        .bind(tournament_id)
        .execute(&self.store.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::InvalidState(
                "Tournament can no longer be edited".to_string(),
            ));
        }

        self.store
            .events
            .publish(EntityKind::Tournament, tournament_id);
        Ok(tournament)
    }

    /// Publish the custom room credentials participants need to enter the match
    pub async fn set_room(
        &self,
        tournament_id: &str,
        room_id: String,
        room_password: Option<String>,
    ) -> Result<Tournament> {
        if room_id.trim().is_empty() {
            return Err(AppError::Validation("Room id cannot be empty".to_string()));
        }

        let updated = sqlx::query(
            "UPDATE tournaments SET room_id = ?, room_password = ?
             WHERE id = ? AND status != 'completed'",
        )
        .bind(&room_id)
        .bind(&room_password)
        .bind(tournament_id)
        .execute(&self.store.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Missing rows and finished tournaments both fail the guard.
            self.store.load(tournament_id).await?;
            return Err(AppError::InvalidState(
                "Cannot change the room of a completed tournament".to_string(),
            ));
        }

        self.store
            .events
            .publish(EntityKind::Tournament, tournament_id);
        self.store.load(tournament_id).await
    }

    /// Move a tournament into the live state once the match starts
    pub async fn start(&self, tournament_id: &str) -> Result<Tournament> {
        let started = sqlx::query(
            "UPDATE tournaments SET status = 'live' WHERE id = ? AND status IN ('waiting', 'full')",
        )
        .bind(tournament_id)
        .execute(&self.store.pool)
        .await?;

        let tournament = self.store.load(tournament_id).await?;

        if started.rows_affected() == 0 {
            return Err(AppError::InvalidState(format!(
                "Tournament cannot start from status '{}'",
                tournament.status
            )));
        }

        audit::log_tournament_event(tournament_id, "started", &tournament.title);
        self.store
            .events
            .publish(EntityKind::Tournament, tournament_id);

        tracing::info!(
            "Started tournament: {} ({})",
            tournament.title,
            tournament_id
        );
        Ok(tournament)
    }

    /// Close out a live tournament, optionally attaching a results payload.
    /// The results blob is stored as-is; reward payouts go through admin
    /// grants so every payout shows up as its own ledger entry.
    pub async fn complete(
        &self,
        tournament_id: &str,
        results: Option<String>,
    ) -> Result<Tournament> {
        let completed = sqlx::query(
            "UPDATE tournaments SET status = 'completed', results = COALESCE(?, results)
             WHERE id = ? AND status = 'live'",
        )
        .bind(&results)
        .bind(tournament_id)
        .execute(&self.store.pool)
        .await?;

        let tournament = self.store.load(tournament_id).await?;

        if completed.rows_affected() == 0 {
            return Err(AppError::InvalidState(format!(
                "Tournament cannot be completed from status '{}'",
                tournament.status
            )));
        }

        audit::log_tournament_event(tournament_id, "completed", &tournament.title);
        self.store
            .events
            .publish(EntityKind::Tournament, tournament_id);

        tracing::info!(
            "Completed tournament: {} ({})",
            tournament.title,
            tournament_id
        );
        Ok(tournament)
    }

    /// Join a tournament on behalf of a player
    pub async fn join(&self, account_id: &str, tournament_id: &str) -> Result<Tournament> {
        self.participation.join(account_id, tournament_id).await
    }

    pub async fn get(&self, tournament_id: &str) -> Result<Tournament> {
        self.store.load(tournament_id).await
    }

    pub async fn list(&self) -> Result<Vec<Tournament>> {
        self.store.list().await
    }

    pub async fn is_participant(&self, tournament_id: &str, account_id: &str) -> Result<bool> {
        self.store.is_participant(tournament_id, account_id).await
    }
}

fn validate_mode(mode: &str) -> Result<()> {
    if !TOURNAMENT_MODES.contains(&mode) {
        return Err(AppError::Validation(format!(
            "Unknown tournament mode '{}'",
            mode
        )));
    }
    Ok(())
}

fn validate_schedule(scheduled_at: &str) -> Result<()> {
    DateTime::parse_from_rfc3339(scheduled_at).map_err(|_| {
        AppError::Validation("Scheduled time must be an RFC 3339 timestamp".to_string())
    })?;
    Ok(())
}
