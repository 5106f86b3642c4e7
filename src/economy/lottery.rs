//! Lottery Engine
//!
//! Weekly draw over players active in the trailing seven days (by last
//! bonus claim). Tiers are processed in priority order and draw disjoint
//! winner sets without replacement; the first tier the remaining pool
//! cannot fill stops the draw, along with every tier after it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;

use crate::{
    error::EconomyResult,
    models::{TxDetail, TxKind},
    store::{ledger, players, GameDb},
};

use super::market::SimSeed;

const ACTIVE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct PrizeTier {
    pub name: String,
    pub amount: f64,
    pub winners: usize,
}

impl PrizeTier {
    pub fn new(name: &str, amount: f64, winners: usize) -> Self {
        Self {
            name: name.to_string(),
            amount,
            winners,
        }
    }
}

/// Grand / second / third prize structure of the weekly draw.
pub fn default_tiers() -> Vec<PrizeTier> {
    vec![
        PrizeTier::new("Grand Prize", 10_000.0, 1),
        PrizeTier::new("Second Prize", 5_000.0, 2),
        PrizeTier::new("Third Prize", 2_500.0, 3),
    ]
}

#[derive(Debug, Clone)]
pub struct LotteryAward {
    pub player_id: i64,
    pub external_id: String,
    pub display_name: String,
    pub tier: String,
    pub amount: f64,
}

pub struct LotteryEngine {
    db: Arc<GameDb>,
    tiers: Vec<PrizeTier>,
    rng: Mutex<ChaCha8Rng>,
}

impl LotteryEngine {
    pub fn new(db: Arc<GameDb>, tiers: Vec<PrizeTier>, seed: SimSeed) -> Self {
        Self {
            db,
            tiers,
            rng: Mutex::new(seed.rng()),
        }
    }

    /// Run one draw. An empty pool is a no-op; otherwise winners are
    /// credited immediately and the full award list is returned for
    /// downstream notification.
    pub async fn run_weekly(&self, now: DateTime<Utc>) -> EconomyResult<Vec<LotteryAward>> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
        let mut pool = players::active_since(&tx, cutoff)?;
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let mut awards = Vec::new();
        {
            let mut rng = self.rng.lock();
            for tier in &self.tiers {
                if pool.len() < tier.winners {
                    break;
                }

                let mut picked: Vec<usize> =
                    index::sample(&mut *rng, pool.len(), tier.winners).into_vec();
                // Remove from the back so earlier indexes stay valid.
                picked.sort_unstable_by(|a, b| b.cmp(a));

                for idx in picked {
                    let winner = pool.swap_remove(idx);
                    players::apply_earn(&tx, winner.id, tier.amount)?;
                    ledger::append(
                        &tx,
                        winner.id,
                        TxKind::LotteryWin,
                        tier.amount,
                        &TxDetail::LotteryWin {
                            tier: tier.name.clone(),
                        },
                        now,
                    )?;
                    awards.push(LotteryAward {
                        player_id: winner.id,
                        external_id: winner.external_id,
                        display_name: winner.display_name,
                        tier: tier.name.clone(),
                        amount: tier.amount,
                    });
                }
            }
        }

        tx.commit()?;
        Ok(awards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::NamedTempFile;

    async fn fixture(active_players: usize) -> (Arc<GameDb>, Vec<i64>, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let db = Arc::new(GameDb::new(temp.path().to_str().unwrap()).unwrap());
        let conn = db.lock().await;
        let mut ids = Vec::new();
        for i in 0..active_players {
            let player = players::get_or_create(
                &conn,
                &format!("p{i}"),
                &format!("Player {i}"),
                100.0,
            )
            .unwrap();
            // Active = claimed a bonus within the window.
            players::set_daily(&conn, player.id, 1, Utc::now() - Duration::days(1)).unwrap();
            ids.push(player.id);
        }
        drop(conn);
        (db, ids, temp)
    }

    #[tokio::test]
    async fn empty_pool_is_a_no_op() {
        let (db, _ids, _temp) = fixture(0).await;
        let engine = LotteryEngine::new(db, default_tiers(), SimSeed::Fixed(1));
        let awards = engine.run_weekly(Utc::now()).await.unwrap();
        assert!(awards.is_empty());
    }

    #[tokio::test]
    async fn stale_players_are_not_in_the_pool() {
        let (db, ids, _temp) = fixture(1).await;
        {
            let conn = db.lock().await;
            players::set_daily(&conn, ids[0], 1, Utc::now() - Duration::days(10)).unwrap();
        }
        let engine = LotteryEngine::new(db, default_tiers(), SimSeed::Fixed(1));
        assert!(engine.run_weekly(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn small_pool_skips_unfillable_tiers() {
        // Two active players, tiers 1x10000 then 2x5000: the grand prize
        // goes out, the second tier needs 2 winners from a pool of 1 and is
        // skipped.
        let (db, ids, _temp) = fixture(2).await;
        let tiers = vec![
            PrizeTier::new("Grand Prize", 10_000.0, 1),
            PrizeTier::new("Second Prize", 5_000.0, 2),
        ];
        let engine = LotteryEngine::new(db.clone(), tiers, SimSeed::Fixed(3));

        let awards = engine.run_weekly(Utc::now()).await.unwrap();
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].tier, "Grand Prize");
        assert!(ids.contains(&awards[0].player_id));

        let conn = db.lock().await;
        let winner = players::get(&conn, awards[0].player_id).unwrap().unwrap();
        assert_eq!(winner.balance, 10_100.0);
        assert_eq!(winner.total_earned, 10_000.0);
        let entries = ledger::recent_for_player(&conn, winner.id, 5).unwrap();
        assert_eq!(entries[0].kind, TxKind::LotteryWin);
    }

    #[tokio::test]
    async fn winners_are_disjoint_across_tiers() {
        let (db, _ids, _temp) = fixture(10).await;
        let engine = LotteryEngine::new(db, default_tiers(), SimSeed::Fixed(9));

        let awards = engine.run_weekly(Utc::now()).await.unwrap();
        // 1 grand + 2 second + 3 third.
        assert_eq!(awards.len(), 6);
        let unique: HashSet<i64> = awards.iter().map(|a| a.player_id).collect();
        assert_eq!(unique.len(), 6);
        assert_eq!(
            awards.iter().filter(|a| a.tier == "Third Prize").count(),
            3
        );
    }

    #[tokio::test]
    async fn same_seed_picks_the_same_winners() {
        let (db_a, _ia, _ta) = fixture(8).await;
        let (db_b, _ib, _tb) = fixture(8).await;
        let now = Utc::now();

        let a = LotteryEngine::new(db_a, default_tiers(), SimSeed::Fixed(42))
            .run_weekly(now)
            .await
            .unwrap();
        let b = LotteryEngine::new(db_b, default_tiers(), SimSeed::Fixed(42))
            .run_weekly(now)
            .await
            .unwrap();

        let picks_a: Vec<(String, String)> = a
            .iter()
            .map(|w| (w.external_id.clone(), w.tier.clone()))
            .collect();
        let picks_b: Vec<(String, String)> = b
            .iter()
            .map(|w| (w.external_id.clone(), w.tier.clone()))
            .collect();
        assert_eq!(picks_a, picks_b);
    }
}
