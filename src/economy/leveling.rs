//! Leveling Engine
//!
//! Maps accumulated experience onto the static level table and exposes the
//! progress fraction toward the next threshold. Levels only ever increase:
//! `check_level_up` persists a higher recomputed level and never lowers one.

use std::sync::Arc;

use rusqlite::Connection;

use crate::{
    catalog::LevelTable,
    error::{EconomyError, EconomyResult},
    store::{players, GameDb},
};

/// Progress toward the next level, as shown to players.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelProgress {
    pub percent: f64,
    pub exp_into_level: f64,
    pub exp_needed: f64,
}

/// Highest level whose threshold is at or below `experience`; 1 when the
/// experience is below every threshold or the table is empty.
pub fn level_for(levels: &LevelTable, experience: f64) -> u32 {
    levels
        .requirements()
        .iter()
        .rev()
        .find(|r| experience >= r.exp_required)
        .map(|r| r.level)
        .unwrap_or(1)
}

/// Add experience and apply the monotonic level-up check, all against the
/// caller's open transaction. Returns the new level when one was reached.
pub fn grant_experience(
    conn: &Connection,
    levels: &LevelTable,
    player_id: i64,
    amount: f64,
) -> rusqlite::Result<Option<u32>> {
    players::add_experience(conn, player_id, amount)?;
    let Some(player) = players::get(conn, player_id)? else {
        return Ok(None);
    };
    let computed = level_for(levels, player.experience);
    if computed > player.level {
        players::set_level(conn, player_id, computed)?;
        Ok(Some(computed))
    } else {
        Ok(None)
    }
}

pub struct LevelingEngine {
    db: Arc<GameDb>,
    levels: Arc<LevelTable>,
}

impl LevelingEngine {
    pub fn new(db: Arc<GameDb>, levels: Arc<LevelTable>) -> Self {
        Self { db, levels }
    }

    pub fn level_for(&self, experience: f64) -> u32 {
        level_for(&self.levels, experience)
    }

    /// Progress within the current level. At the table's final level there
    /// is no next threshold, so the sentinel `(100, 0, 100)` is returned.
    pub fn progress(&self, experience: f64) -> LevelProgress {
        let current = self.level_for(experience);
        let floor = self
            .levels
            .requirement(current)
            .map(|r| r.exp_required)
            .unwrap_or(0.0);

        let Some(next) = self.levels.next_after(current) else {
            return LevelProgress {
                percent: 100.0,
                exp_into_level: 0.0,
                exp_needed: 100.0,
            };
        };

        let exp_into_level = experience - floor;
        let exp_needed = next.exp_required - floor;
        LevelProgress {
            percent: (exp_into_level / exp_needed * 1000.0).round() / 10.0,
            exp_into_level,
            exp_needed,
        }
    }

    /// Recompute the player's level from experience and persist it if it
    /// strictly increased. Returns the new level on a level-up.
    pub async fn check_level_up(&self, player_id: i64) -> EconomyResult<Option<u32>> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let player = players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;
        let computed = level_for(&self.levels, player.experience);
        if computed <= player.level {
            return Ok(None);
        }

        players::set_level(&tx, player_id, computed)?;
        tx.commit()?;
        Ok(Some(computed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LevelTable;
    use tempfile::NamedTempFile;

    fn test_table() -> Arc<LevelTable> {
        Arc::new(
            LevelTable::from_json(
                r#"{"level_up_requirements":[
                    {"level":1,"exp_required":0,"business_limit":1},
                    {"level":2,"exp_required":100,"business_limit":2},
                    {"level":3,"exp_required":300,"business_limit":3}
                ]}"#,
            )
            .unwrap(),
        )
    }

    fn test_engine() -> (LevelingEngine, Arc<GameDb>, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let db = Arc::new(GameDb::new(temp.path().to_str().unwrap()).unwrap());
        (LevelingEngine::new(db.clone(), test_table()), db, temp)
    }

    #[test]
    fn level_for_picks_highest_reached_threshold() {
        let table = test_table();
        assert_eq!(level_for(&table, 0.0), 1);
        assert_eq!(level_for(&table, 99.9), 1);
        assert_eq!(level_for(&table, 100.0), 2);
        assert_eq!(level_for(&table, 299.0), 2);
        assert_eq!(level_for(&table, 300.0), 3);
        assert_eq!(level_for(&table, 10_000.0), 3);
    }

    #[test]
    fn level_for_empty_table_is_one() {
        let empty = LevelTable::from_json(r#"{"level_up_requirements":[]}"#).unwrap();
        assert_eq!(level_for(&empty, 5000.0), 1);
    }

    #[tokio::test]
    async fn progress_midway_and_at_max() {
        let (engine, _db, _temp) = test_engine();

        let mid = engine.progress(150.0);
        assert_eq!(mid.percent, 25.0);
        assert_eq!(mid.exp_into_level, 50.0);
        assert_eq!(mid.exp_needed, 200.0);

        let max = engine.progress(500.0);
        assert_eq!(
            max,
            LevelProgress {
                percent: 100.0,
                exp_into_level: 0.0,
                exp_needed: 100.0,
            }
        );
    }

    #[tokio::test]
    async fn check_level_up_persists_and_is_monotonic() {
        let (engine, db, _temp) = test_engine();

        let player = {
            let conn = db.lock().await;
            let player = players::get_or_create(&conn, "p1", "Player One", 1000.0).unwrap();
            players::add_experience(&conn, player.id, 120.0).unwrap();
            player
        };

        assert_eq!(engine.check_level_up(player.id).await.unwrap(), Some(2));
        // Second call: nothing new to report.
        assert_eq!(engine.check_level_up(player.id).await.unwrap(), None);

        // A stored level above the computed one is never lowered.
        {
            let conn = db.lock().await;
            players::set_level(&conn, player.id, 3).unwrap();
        }
        assert_eq!(engine.check_level_up(player.id).await.unwrap(), None);
        let conn = db.lock().await;
        assert_eq!(players::get(&conn, player.id).unwrap().unwrap().level, 3);
    }

    #[tokio::test]
    async fn grant_experience_levels_up_inside_transaction() {
        let (_engine, db, _temp) = test_engine();
        let table = test_table();

        let mut conn = db.lock().await;
        let player = players::get_or_create(&conn, "p2", "Player Two", 0.0).unwrap();

        let tx = conn.transaction().unwrap();
        assert_eq!(
            grant_experience(&tx, &table, player.id, 50.0).unwrap(),
            None
        );
        assert_eq!(
            grant_experience(&tx, &table, player.id, 60.0).unwrap(),
            Some(2)
        );
        tx.commit().unwrap();

        let stored = players::get(&conn, player.id).unwrap().unwrap();
        assert_eq!(stored.level, 2);
        assert_eq!(stored.experience, 110.0);
    }

    #[tokio::test]
    async fn check_level_up_unknown_player_is_not_found() {
        let (engine, _db, _temp) = test_engine();
        let err = engine.check_level_up(999).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
