use crate::{
    db::models::{LedgerEntry, LedgerReason, Tournament, TournamentParticipant},
    error::{AppError, Result},
    ledger,
    ws::messages::EntityKind,
};

use super::store::{self, TournamentStore};

pub(crate) struct ParticipationService {
    store: TournamentStore,
}

impl ParticipationService {
    pub(crate) fn new(store: TournamentStore) -> Self {
        Self { store }
    }

    /// Join a tournament: claim a seat and debit the entry fee as a single
    /// transaction. Either both effects commit or neither does.
    pub(crate) async fn join(&self, account_id: &str, tournament_id: &str) -> Result<Tournament> {
        let mut tx = self.store.pool.begin().await?;

        // The seat claim runs first so the transaction opens with a write.
        // Concurrent joiners serialize here, and every read below observes
        // the state the claim saw. The guards repeat the status and
        // capacity rules, so two racers cannot both take the last slot.
        let claimed = sqlx::query(
            "UPDATE tournaments
             SET joined_count = joined_count + 1,
                 status = CASE
                     WHEN joined_count + 1 >= max_players THEN 'full'
                     ELSE status
                 END
             WHERE id = ? AND status = 'waiting' AND joined_count < max_players",
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        let tournament = store::load_tournament(&mut tx, tournament_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tournament not found".to_string()))?;

        let account = ledger::find_account(&mut tx, account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        if account.is_admin() {
            return Err(AppError::InvalidState(
                "Admin accounts cannot join tournaments".to_string(),
            ));
        }

        if store::is_participant(&mut tx, tournament_id, account_id).await? {
            return Err(AppError::InvalidState(
                "Already joined this tournament".to_string(),
            ));
        }

        if claimed.rows_affected() == 0 {
            // No seat was claimed. The loaded row says why: any status off
            // 'waiting' is closed to joins, and a waiting row can only have
            // lost the capacity race.
            if tournament.status != "waiting" {
                return Err(AppError::InvalidState(
                    "Tournament is not open for joining".to_string(),
                ));
            }
            return Err(AppError::InvalidState("Tournament is full".to_string()));
        }

        // Balance check and debit share this transaction with the seat
        // claim, so the fee cannot be double-spent by parallel joins.
        if tournament.entry_fee > 0 {
            let balance = ledger::balance_of(&mut tx, account_id).await?;
            if balance < tournament.entry_fee {
                return Err(AppError::InsufficientFunds(
                    "Insufficient balance for the entry fee".to_string(),
                ));
            }
        }

        let participant =
            TournamentParticipant::new(tournament_id.to_string(), account_id.to_string());

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO tournament_participants (tournament_id, account_id, joined_at)
             VALUES (?, ?, ?)",
        )
        .bind(&participant.tournament_id)
        .bind(&participant.account_id)
        .bind(&participant.joined_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::InvalidState(
                "Already joined this tournament".to_string(),
            ));
        }

        if tournament.entry_fee > 0 {
            let entry = LedgerEntry::new(
                account_id.to_string(),
                -tournament.entry_fee,
                LedgerReason::TournamentEntry,
                Some(format!("Tournament Entry: {}", tournament.title)),
                None,
            );
            ledger::insert_entry(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Player {} ({}) joined tournament {}",
            account.username,
            account_id,
            tournament_id
        );
        crate::audit::log_tournament_event(
            tournament_id,
            "player_joined",
            &format!("{} took seat {}", account.username, tournament.joined_count),
        );

        self.store
            .events
            .publish(EntityKind::Tournament, tournament_id);
        if tournament.entry_fee > 0 {
            self.store.events.publish(EntityKind::Ledger, account_id);
        }

        Ok(tournament)
    }
}
