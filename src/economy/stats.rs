//! Aggregate reporting over players and the ledger: the daily digest, the
//! top-player board, and the large-transaction scan. Read-only; everything
//! here is derived from state the engines already wrote.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    catalog::EventThresholds,
    error::EconomyResult,
    models::{round2, TxDetail, TxKind},
    store::{ledger, players, GameDb},
};

#[derive(Debug, Clone)]
pub struct TopPlayer {
    pub display_name: String,
    pub balance: f64,
    pub level: u32,
}

#[derive(Debug, Clone)]
pub struct EconomyStats {
    pub total_players: i64,
    pub active_players_24h: i64,
    pub total_balance: f64,
    pub total_earned: f64,
    pub total_spent: f64,
    pub ledger_entries_24h: i64,
    pub top_players: Vec<TopPlayer>,
}

/// A ledger entry that cleared its kind's announcement threshold.
#[derive(Debug, Clone)]
pub struct LargeTransaction {
    pub player_name: String,
    pub kind: TxKind,
    pub amount: f64,
    pub detail: TxDetail,
}

pub struct ReportingEngine {
    db: Arc<GameDb>,
}

impl ReportingEngine {
    pub fn new(db: Arc<GameDb>) -> Self {
        Self { db }
    }

    pub async fn economy_stats(&self, now: DateTime<Utc>) -> EconomyResult<EconomyStats> {
        let conn = self.db.lock().await;
        let day_ago = now - Duration::hours(24);

        let total_players = players::count(&conn)?;
        let active_players_24h = players::count_active_since(&conn, day_ago)?;
        let (total_balance, total_earned, total_spent) = players::money_totals(&conn)?;
        let ledger_entries_24h = ledger::count_since(&conn, day_ago)?;
        let top_players = players::top_by_balance(&conn, 5)?
            .into_iter()
            .map(|p| TopPlayer {
                display_name: p.display_name,
                balance: round2(p.balance),
                level: p.level,
            })
            .collect();

        Ok(EconomyStats {
            total_players,
            active_players_24h,
            total_balance: round2(total_balance),
            total_earned: round2(total_earned),
            total_spent: round2(total_spent),
            ledger_entries_24h,
            top_players,
        })
    }

    pub async fn top_players(&self, limit: usize) -> EconomyResult<Vec<TopPlayer>> {
        let conn = self.db.lock().await;
        Ok(players::top_by_balance(&conn, limit)?
            .into_iter()
            .map(|p| TopPlayer {
                display_name: p.display_name,
                balance: round2(p.balance),
                level: p.level,
            })
            .collect())
    }

    /// Ledger entries since `since` big enough to announce. Business kinds
    /// and stock kinds carry separate thresholds; every other kind stays
    /// quiet regardless of size.
    pub async fn large_transactions_since(
        &self,
        since: DateTime<Utc>,
        thresholds: &EventThresholds,
    ) -> EconomyResult<Vec<LargeTransaction>> {
        let conn = self.db.lock().await;

        let floor = thresholds
            .business_min_amount
            .min(thresholds.stock_min_amount);
        let entries = ledger::large_since(&conn, since, floor)?;

        let mut out = Vec::new();
        for entry in entries {
            let min = match entry.kind {
                TxKind::BusinessPurchase | TxKind::BusinessUpgrade => {
                    thresholds.business_min_amount
                }
                TxKind::StockBuy | TxKind::StockSell => thresholds.stock_min_amount,
                _ => continue,
            };
            if entry.amount.abs() < min {
                continue;
            }
            let player_name = players::get(&conn, entry.player_id)?
                .map(|p| p.display_name)
                .unwrap_or_else(|| format!("Player {}", entry.player_id));
            out.push(LargeTransaction {
                player_name,
                kind: entry.kind,
                amount: entry.amount,
                detail: entry.detail,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn fixture() -> (ReportingEngine, Arc<GameDb>, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let db = Arc::new(GameDb::new(temp.path().to_str().unwrap()).unwrap());
        (ReportingEngine::new(db.clone()), db, temp)
    }

    #[tokio::test]
    async fn stats_aggregate_players_and_ledger() {
        let (engine, db, _temp) = fixture().await;
        let now = Utc::now();
        {
            let conn = db.lock().await;
            let a = players::get_or_create(&conn, "a", "Alice", 1000.0).unwrap();
            let b = players::get_or_create(&conn, "b", "Bob", 250.0).unwrap();
            players::set_daily(&conn, a.id, 1, now - Duration::hours(2)).unwrap();
            players::set_daily(&conn, b.id, 1, now - Duration::days(3)).unwrap();
            ledger::append(
                &conn,
                a.id,
                TxKind::DailyBonus,
                115.5,
                &TxDetail::DailyBonus {
                    streak: 1,
                    streak_multiplier: 1.1,
                    level_multiplier: 1.05,
                },
                now - Duration::hours(2),
            )
            .unwrap();
        }

        let stats = engine.economy_stats(now).await.unwrap();
        assert_eq!(stats.total_players, 2);
        assert_eq!(stats.active_players_24h, 1);
        assert_eq!(stats.total_balance, 1250.0);
        assert_eq!(stats.ledger_entries_24h, 1);
        assert_eq!(stats.top_players.len(), 2);
        assert_eq!(stats.top_players[0].display_name, "Alice");
    }

    #[tokio::test]
    async fn large_scan_applies_per_kind_thresholds() {
        let (engine, db, _temp) = fixture().await;
        let now = Utc::now();
        {
            let conn = db.lock().await;
            let p = players::get_or_create(&conn, "w", "Whale", 1_000_000.0).unwrap();
            let detail = TxDetail::StockBuy {
                symbol: "ACME".into(),
                stock_name: "Acme Corp".into(),
                quantity: 100,
                price_per_share: 60.0,
                total_cost: 6000.0,
            };
            // Clears the stock threshold (5000).
            ledger::append(&conn, p.id, TxKind::StockBuy, -6000.0, &detail, now).unwrap();
            // Same size as a business purchase would not clear 10000.
            ledger::append(
                &conn,
                p.id,
                TxKind::BusinessPurchase,
                -6000.0,
                &TxDetail::BusinessPurchase {
                    business_type: "bank".into(),
                    business_name: "Bank".into(),
                    level: 1,
                },
                now,
            )
            .unwrap();
            // Large bonus payouts are never announced.
            ledger::append(
                &conn,
                p.id,
                TxKind::LotteryWin,
                20_000.0,
                &TxDetail::LotteryWin {
                    tier: "Grand Prize".into(),
                },
                now,
            )
            .unwrap();
        }

        let hits = engine
            .large_transactions_since(now - Duration::hours(1), &EventThresholds::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, TxKind::StockBuy);
        assert_eq!(hits[0].player_name, "Whale");
    }
}
