use crate::{
    db::{models::Tournament, DbPool},
    error::{AppError, Result},
    ws::EventHub,
};
use sqlx::SqliteConnection;
use std::sync::Arc;

/// Persistence layer for tournaments and their participant sets.
#[derive(Clone)]
pub struct TournamentStore {
    pub(crate) pool: DbPool,
    pub(crate) events: Arc<EventHub>,
}

impl TournamentStore {
    pub fn new(pool: DbPool, events: Arc<EventHub>) -> Self {
        Self { pool, events }
    }

    pub(crate) async fn save(&self, tournament: &Tournament) -> Result<()> {
        sqlx::query(
            "INSERT INTO tournaments (
                id, title, description, mode, entry_fee, kill_reward, booyah_reward,
                max_players, joined_count, status, scheduled_at, room_id, room_password,
                rules, results, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tournament.id)
        .bind(&tournament.title)
        .bind(&tournament.description)
        .bind(&tournament.mode)
        .bind(tournament.entry_fee)
        .bind(tournament.kill_reward)
        .bind(tournament.booyah_reward)
        .bind(tournament.max_players)
        .bind(tournament.joined_count)
        .bind(&tournament.status)
        .bind(&tournament.scheduled_at)
        .bind(&tournament.room_id)
        .bind(&tournament.room_password)
        .bind(&tournament.rules)
        .bind(&tournament.results)
        .bind(&tournament.created_by)
        .bind(&tournament.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load(&self, tournament_id: &str) -> Result<Tournament> {
        sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = ?")
            .bind(tournament_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    AppError::NotFound("Tournament not found".to_string())
                }
                e => AppError::Database(e),
            })
    }

    /// All tournaments, soonest scheduled first.
    pub async fn list(&self) -> Result<Vec<Tournament>> {
        let tournaments = sqlx::query_as::<_, Tournament>(
            "SELECT * FROM tournaments ORDER BY scheduled_at, created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tournaments)
    }

    pub async fn is_participant(&self, tournament_id: &str, account_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM tournament_participants WHERE tournament_id = ? AND account_id = ?",
        )
        .bind(tournament_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

// ==================== Transaction-level helpers ====================

pub(crate) async fn load_tournament(
    conn: &mut SqliteConnection,
    tournament_id: &str,
) -> Result<Option<Tournament>> {
    let tournament = sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = ?")
        .bind(tournament_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(tournament)
}

pub(crate) async fn is_participant(
    conn: &mut SqliteConnection,
    tournament_id: &str,
    account_id: &str,
) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM tournament_participants WHERE tournament_id = ? AND account_id = ?",
    )
    .bind(tournament_id)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.is_some())
}
