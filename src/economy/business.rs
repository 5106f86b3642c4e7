//! Business Accrual Engine
//!
//! Purchases, upgrades and time-proportional profit collection for owned
//! business instances. Price and profit curves are pure functions of the
//! catalog definition and the level.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    catalog::{BusinessCatalog, BusinessType, LevelTable},
    error::{EconomyError, EconomyResult},
    models::{round2, BusinessHolding, CollectedBusiness, TxDetail, TxKind},
    store::{businesses, ledger, players, GameDb},
};

use super::leveling;

const EXP_PER_PURCHASE: f64 = 50.0;
const EXP_PER_UPGRADE: f64 = 25.0;
/// Share of collected profit converted to experience.
const PROFIT_EXP_SHARE: f64 = 0.1;
/// Holdings idle for less than this many hours are skipped entirely.
const MIN_COLLECT_HOURS: f64 = 1.0;

/// Cost of buying the type at `level` (level 1 = base price), or of
/// upgrading a holding currently at `level`.
pub fn price(def: &BusinessType, level: u32) -> f64 {
    round2(def.base_price * def.upgrade_multiplier.powi(level as i32 - 1))
}

pub fn profit_per_hour(def: &BusinessType, level: u32) -> f64 {
    round2(def.base_profit_per_hour * def.upgrade_multiplier.powi(level as i32 - 1))
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub holding: BusinessHolding,
    pub price: f64,
    pub new_player_level: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    pub holding_id: i64,
    pub new_level: u32,
    pub price: f64,
    pub profit_per_hour: f64,
    pub new_player_level: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub total: f64,
    pub collected: Vec<CollectedBusiness>,
    pub new_player_level: Option<u32>,
}

pub struct BusinessEngine {
    db: Arc<GameDb>,
    businesses: Arc<BusinessCatalog>,
    levels: Arc<LevelTable>,
}

impl BusinessEngine {
    pub fn new(db: Arc<GameDb>, businesses: Arc<BusinessCatalog>, levels: Arc<LevelTable>) -> Self {
        Self {
            db,
            businesses,
            levels,
        }
    }

    pub fn catalog(&self) -> &BusinessCatalog {
        &self.businesses
    }

    pub async fn holdings(&self, player_id: i64) -> EconomyResult<Vec<BusinessHolding>> {
        let conn = self.db.lock().await;
        Ok(businesses::for_player(&conn, player_id)?)
    }

    /// Sum of the cached hourly rates across a player's holdings.
    pub async fn total_profit_per_hour(&self, player_id: i64) -> EconomyResult<f64> {
        let conn = self.db.lock().await;
        let holdings = businesses::for_player(&conn, player_id)?;
        Ok(round2(holdings.iter().map(|h| h.profit_per_hour).sum()))
    }

    pub async fn purchase(&self, player_id: i64, type_id: &str) -> EconomyResult<PurchaseOutcome> {
        let def = self
            .businesses
            .get(type_id)
            .ok_or_else(|| EconomyError::NotFound(format!("business type {type_id}")))?;

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let player = players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;

        let owned = businesses::count_for_player(&tx, player_id)?;
        let limit = self.levels.business_limit(player.level);
        if owned >= limit {
            return Err(EconomyError::LimitExceeded(limit));
        }

        let cost = price(def, 1);
        if player.balance < cost {
            return Err(EconomyError::InsufficientFunds {
                needed: cost,
                balance: player.balance,
            });
        }

        let now = Utc::now();
        players::apply_spend(&tx, player_id, cost)?;
        let holding = businesses::insert(&tx, player_id, &def.id, profit_per_hour(def, 1), now)?;
        ledger::append(
            &tx,
            player_id,
            TxKind::BusinessPurchase,
            -cost,
            &TxDetail::BusinessPurchase {
                business_type: def.id.clone(),
                business_name: def.name.clone(),
                level: 1,
            },
            now,
        )?;
        let new_player_level =
            leveling::grant_experience(&tx, &self.levels, player_id, EXP_PER_PURCHASE)?;

        tx.commit()?;
        Ok(PurchaseOutcome {
            holding,
            price: cost,
            new_player_level,
        })
    }

    pub async fn upgrade(&self, player_id: i64, holding_id: i64) -> EconomyResult<UpgradeOutcome> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let holding = businesses::get(&tx, holding_id)?
            .filter(|h| h.player_id == player_id)
            .ok_or_else(|| EconomyError::NotFound(format!("business {holding_id}")))?;
        let def = self
            .businesses
            .get(&holding.business_type)
            .ok_or_else(|| EconomyError::NotFound(format!("business type {}", holding.business_type)))?;

        if holding.level >= def.max_level {
            return Err(EconomyError::MaxLevelReached(def.max_level));
        }

        let player = players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;
        let cost = price(def, holding.level);
        if player.balance < cost {
            return Err(EconomyError::InsufficientFunds {
                needed: cost,
                balance: player.balance,
            });
        }

        let now = Utc::now();
        let new_level = holding.level + 1;
        let new_rate = profit_per_hour(def, new_level);

        players::apply_spend(&tx, player_id, cost)?;
        businesses::set_level(&tx, holding_id, new_level, new_rate)?;
        ledger::append(
            &tx,
            player_id,
            TxKind::BusinessUpgrade,
            -cost,
            &TxDetail::BusinessUpgrade {
                business_type: def.id.clone(),
                business_name: def.name.clone(),
                old_level: holding.level,
                new_level,
            },
            now,
        )?;
        let new_player_level =
            leveling::grant_experience(&tx, &self.levels, player_id, EXP_PER_UPGRADE)?;

        tx.commit()?;
        Ok(UpgradeOutcome {
            holding_id,
            new_level,
            price: cost,
            profit_per_hour: new_rate,
            new_player_level,
        })
    }

    /// Collect accrued profit across all of the player's holdings.
    ///
    /// Holdings idle for under an hour are skipped without resetting their
    /// clock; qualifying holdings accrue continuously and uncapped. The
    /// aggregate is credited once, with one ledger entry per call. A zero
    /// total is a valid outcome, not an error.
    pub async fn collect_profits(
        &self,
        player_id: i64,
        now: DateTime<Utc>,
    ) -> EconomyResult<CollectOutcome> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;

        let holdings = businesses::for_player(&tx, player_id)?;
        let mut total = 0.0;
        let mut collected = Vec::new();

        for holding in &holdings {
            let hours = (now - holding.last_collected).num_seconds() as f64 / 3600.0;
            if hours < MIN_COLLECT_HOURS {
                continue;
            }

            let profit = holding.profit_per_hour * hours;
            total += profit;
            collected.push(CollectedBusiness {
                business_type: holding.business_type.clone(),
                profit: round2(profit),
                hours,
                level: holding.level,
            });
            businesses::set_last_collected(&tx, holding.id, now)?;
        }

        if collected.is_empty() {
            return Ok(CollectOutcome {
                total: 0.0,
                collected,
                new_player_level: None,
            });
        }

        let total = round2(total);
        players::apply_earn(&tx, player_id, total)?;
        ledger::append(
            &tx,
            player_id,
            TxKind::ProfitCollection,
            total,
            &TxDetail::ProfitCollection {
                breakdown: collected.clone(),
            },
            now,
        )?;
        let new_player_level =
            leveling::grant_experience(&tx, &self.levels, player_id, total * PROFIT_EXP_SHARE)?;

        tx.commit()?;
        Ok(CollectOutcome {
            total,
            collected,
            new_player_level,
        })
    }
}
