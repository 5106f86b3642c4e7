//! Bonus & Streak Engine
//!
//! One claim per calendar day, compared by date rather than elapsed hours
//! so players can claim shortly after midnight. Claiming on consecutive
//! days grows the streak; any gap resets it to 1.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{EconomyError, EconomyResult},
    models::{round2, TxDetail, TxKind},
    store::{ledger, players, GameDb},
};

/// +10% per streak day.
const STREAK_BONUS_STEP: f64 = 0.10;
/// +5% per player level.
const LEVEL_BONUS_STEP: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct BonusOutcome {
    pub amount: f64,
    pub streak: u32,
    pub streak_multiplier: f64,
    pub level_multiplier: f64,
}

pub struct BonusEngine {
    db: Arc<GameDb>,
    base_bonus: f64,
}

impl BonusEngine {
    pub fn new(db: Arc<GameDb>, base_bonus: f64) -> Self {
        Self { db, base_bonus }
    }

    /// Claim the daily bonus. `now` is explicit so calendar boundaries are
    /// testable; production callers pass `Utc::now()`.
    pub async fn claim_daily(
        &self,
        player_id: i64,
        now: DateTime<Utc>,
    ) -> EconomyResult<BonusOutcome> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let player = players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;

        let today = now.date_naive();
        let streak = match player.last_daily {
            Some(last) if last.date_naive() == today => {
                return Err(EconomyError::AlreadyClaimed);
            }
            Some(last) if last.date_naive() == today - Duration::days(1) => {
                player.daily_streak + 1
            }
            _ => 1,
        };

        let streak_multiplier = 1.0 + streak as f64 * STREAK_BONUS_STEP;
        let level_multiplier = 1.0 + player.level as f64 * LEVEL_BONUS_STEP;
        let amount = round2(self.base_bonus * streak_multiplier * level_multiplier);

        players::apply_earn(&tx, player_id, amount)?;
        players::set_daily(&tx, player_id, streak, now)?;
        ledger::append(
            &tx,
            player_id,
            TxKind::DailyBonus,
            amount,
            &TxDetail::DailyBonus {
                streak,
                streak_multiplier,
                level_multiplier,
            },
            now,
        )?;

        tx.commit()?;
        Ok(BonusOutcome {
            amount,
            streak,
            streak_multiplier,
            level_multiplier,
        })
    }
}
