//! Stock Market Simulator
//!
//! Prices follow a bounded stochastic process with two terms: one shared
//! market-wide trend (a smoothed random walk, drawn once per tick and
//! applied to every symbol) plus per-symbol idiosyncratic noise scaled by
//! the symbol's volatility. The simulator owns its trend and RNG outright;
//! construct it with a fixed seed and a starting trend for reproducible
//! price paths.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    error::{EconomyError, EconomyResult},
    models::{round2, StockPosition, StockQuote, TxDetail, TxKind},
    store::{ledger, players, stocks, GameDb},
};

use super::leveling;
use crate::catalog::{LevelTable, StockCatalog};

const TREND_STEP: f64 = 0.02;
const TREND_BOUND: f64 = 0.1;
const NOISE: f64 = 0.05;
const MAX_DELTA: f64 = 0.3;
const EXP_PER_SHARE_BOUGHT: f64 = 2.0;
const EXP_PER_SHARE_SOLD: f64 = 1.0;

/// RNG seeding policy for the simulator and the lottery.
#[derive(Debug, Clone, Copy)]
pub enum SimSeed {
    /// Seed from OS entropy (production default).
    Entropy,
    /// Pin the RNG for reproducible runs.
    Fixed(u64),
}

impl SimSeed {
    pub fn from_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => SimSeed::Fixed(s),
            None => SimSeed::Entropy,
        }
    }

    pub(crate) fn rng(self) -> ChaCha8Rng {
        match self {
            SimSeed::Entropy => ChaCha8Rng::from_entropy(),
            SimSeed::Fixed(seed) => ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

/// One symbol's move within a tick.
#[derive(Debug, Clone)]
pub struct PriceMove {
    pub symbol: String,
    pub old_price: f64,
    pub new_price: f64,
}

#[derive(Debug, Clone)]
pub struct TickSummary {
    /// Trend value applied uniformly to every symbol this tick.
    pub trend: f64,
    pub moves: Vec<PriceMove>,
}

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub symbol: String,
    pub quantity: i64,
    pub price_per_share: f64,
    /// Signed balance delta: negative for buys, net-of-tax for sells.
    pub amount: f64,
    pub new_player_level: Option<u32>,
}

struct MarketState {
    trend: f64,
    rng: ChaCha8Rng,
}

pub struct MarketSimulator {
    db: Arc<GameDb>,
    catalog: Arc<StockCatalog>,
    levels: Arc<LevelTable>,
    tax_rate: f64,
    state: Mutex<MarketState>,
}

/// Apply a clamped delta to a price, rounding to cents. Multiplicative, so
/// prices decay toward zero but never cross it.
pub fn apply_delta(price: f64, delta: f64) -> f64 {
    round2(price * (1.0 + delta.clamp(-MAX_DELTA, MAX_DELTA)))
}

impl MarketSimulator {
    pub fn new(
        db: Arc<GameDb>,
        catalog: Arc<StockCatalog>,
        levels: Arc<LevelTable>,
        tax_rate: f64,
        seed: SimSeed,
    ) -> Self {
        Self {
            db,
            catalog,
            levels,
            tax_rate,
            state: Mutex::new(MarketState {
                trend: 0.0,
                rng: seed.rng(),
            }),
        }
    }

    /// Override the starting trend (test harnesses).
    pub fn with_trend(self, trend: f64) -> Self {
        self.state.lock().trend = trend.clamp(-TREND_BOUND, TREND_BOUND);
        self
    }

    pub fn current_trend(&self) -> f64 {
        self.state.lock().trend
    }

    /// Insert catalog symbols on first run; later runs leave prices alone.
    pub async fn seed_stocks(&self) -> EconomyResult<usize> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        if stocks::count(&tx)? > 0 {
            return Ok(0);
        }
        let now = Utc::now();
        for listing in self.catalog.all() {
            stocks::insert_quote(
                &tx,
                &listing.symbol,
                &listing.name,
                listing.base_price,
                listing.volatility,
                &listing.description,
                now,
            )?;
        }
        tx.commit()?;
        Ok(self.catalog.all().len())
    }

    /// Advance the market one step: walk the shared trend once, then move
    /// every symbol by `uniform(-vol, vol) + trend + uniform(-0.05, 0.05)`,
    /// clamped to +-30% per tick.
    pub async fn tick(&self) -> EconomyResult<TickSummary> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        let quotes = stocks::all(&tx)?;
        let now = Utc::now();

        let (trend, moves) = {
            let mut state = self.state.lock();
            state.trend =
                (state.trend + state.rng.gen_range(-TREND_STEP..=TREND_STEP))
                    .clamp(-TREND_BOUND, TREND_BOUND);
            let trend = state.trend;

            let moves: Vec<(i64, PriceMove)> = quotes
                .iter()
                .map(|quote| {
                    let idio = state.rng.gen_range(-quote.volatility..=quote.volatility);
                    let noise = state.rng.gen_range(-NOISE..=NOISE);
                    let new_price = apply_delta(quote.current_price, idio + trend + noise);
                    (
                        quote.id,
                        PriceMove {
                            symbol: quote.symbol.clone(),
                            old_price: quote.current_price,
                            new_price,
                        },
                    )
                })
                .collect();
            (trend, moves)
        };

        for (id, m) in &moves {
            stocks::set_price(&tx, *id, m.new_price, now)?;
        }
        tx.commit()?;

        Ok(TickSummary {
            trend,
            moves: moves.into_iter().map(|(_, m)| m).collect(),
        })
    }

    pub async fn quotes(&self) -> EconomyResult<Vec<StockQuote>> {
        let conn = self.db.lock().await;
        Ok(stocks::all(&conn)?)
    }

    pub async fn portfolio(
        &self,
        player_id: i64,
    ) -> EconomyResult<Vec<(StockPosition, StockQuote)>> {
        let conn = self.db.lock().await;
        Ok(stocks::positions_for_player(&conn, player_id)?)
    }

    pub async fn buy(
        &self,
        player_id: i64,
        symbol: &str,
        quantity: i64,
    ) -> EconomyResult<TradeOutcome> {
        if quantity <= 0 {
            return Err(EconomyError::InvalidQuantity);
        }

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let quote = stocks::by_symbol(&tx, symbol)?
            .ok_or_else(|| EconomyError::NotFound(format!("stock {symbol}")))?;
        let player = players::get(&tx, player_id)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {player_id}")))?;

        let cost = quote.current_price * quantity as f64;
        if player.balance < cost {
            return Err(EconomyError::InsufficientFunds {
                needed: cost,
                balance: player.balance,
            });
        }

        let now = Utc::now();
        players::apply_spend(&tx, player_id, cost)?;

        match stocks::position(&tx, player_id, quote.id)? {
            Some(position) => {
                let new_quantity = position.quantity + quantity;
                let invested = position.average_price * position.quantity as f64 + cost;
                stocks::update_position(
                    &tx,
                    position.id,
                    new_quantity,
                    invested / new_quantity as f64,
                )?;
            }
            None => {
                stocks::insert_position(&tx, player_id, quote.id, quantity, quote.current_price)?;
            }
        }

        ledger::append(
            &tx,
            player_id,
            TxKind::StockBuy,
            -cost,
            &TxDetail::StockBuy {
                symbol: quote.symbol.clone(),
                stock_name: quote.name.clone(),
                quantity,
                price_per_share: quote.current_price,
                total_cost: cost,
            },
            now,
        )?;
        let new_player_level = leveling::grant_experience(
            &tx,
            &self.levels,
            player_id,
            quantity as f64 * EXP_PER_SHARE_BOUGHT,
        )?;

        tx.commit()?;
        Ok(TradeOutcome {
            symbol: quote.symbol,
            quantity,
            price_per_share: quote.current_price,
            amount: -cost,
            new_player_level,
        })
    }

    pub async fn sell(
        &self,
        player_id: i64,
        symbol: &str,
        quantity: i64,
    ) -> EconomyResult<TradeOutcome> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        // An unknown symbol cannot be held, so it reads as "no position"
        // rather than a distinct lookup failure.
        let quote = stocks::by_symbol(&tx, symbol)?.ok_or(EconomyError::NoPosition)?;
        let position =
            stocks::position(&tx, player_id, quote.id)?.ok_or(EconomyError::NoPosition)?;

        if quantity <= 0 || quantity > position.quantity {
            return Err(EconomyError::InvalidQuantity);
        }

        let revenue = quote.current_price * quantity as f64;
        let tax = revenue * self.tax_rate;
        let net_revenue = revenue - tax;

        let now = Utc::now();
        players::apply_earn(&tx, player_id, net_revenue)?;

        if quantity == position.quantity {
            stocks::delete_position(&tx, position.id)?;
        } else {
            // Selling shrinks the lot; average cost is untouched.
            stocks::update_position(
                &tx,
                position.id,
                position.quantity - quantity,
                position.average_price,
            )?;
        }

        ledger::append(
            &tx,
            player_id,
            TxKind::StockSell,
            net_revenue,
            &TxDetail::StockSell {
                symbol: quote.symbol.clone(),
                stock_name: quote.name.clone(),
                quantity,
                price_per_share: quote.current_price,
                total_revenue: revenue,
                tax,
                net_revenue,
            },
            now,
        )?;
        let new_player_level = leveling::grant_experience(
            &tx,
            &self.levels,
            player_id,
            quantity as f64 * EXP_PER_SHARE_SOLD,
        )?;

        tx.commit()?;
        Ok(TradeOutcome {
            symbol: quote.symbol,
            quantity,
            price_per_share: quote.current_price,
            amount: net_revenue,
            new_player_level,
        })
    }
}
