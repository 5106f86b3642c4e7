//! SQLite-backed game store.
//!
//! One connection behind an async mutex, WAL journal, schema applied at
//! open. Engines lock the connection, open a `rusqlite` transaction, and
//! compose the row helpers from the submodules inside it — one atomic unit
//! of work per mutating operation, re-reading current state at the start so
//! nothing acts on stale rows.

use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::{Mutex, MutexGuard};

pub mod businesses;
pub mod ledger;
pub mod players;
pub mod stocks;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT UNIQUE NOT NULL,
    display_name TEXT NOT NULL,
    balance REAL NOT NULL DEFAULT 0.0,
    level INTEGER NOT NULL DEFAULT 1,
    experience REAL NOT NULL DEFAULT 0.0,
    daily_streak INTEGER NOT NULL DEFAULT 0,
    last_daily TEXT,
    total_earned REAL NOT NULL DEFAULT 0.0,
    total_spent REAL NOT NULL DEFAULT 0.0,
    is_banned INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_players_last_daily ON players(last_daily);
CREATE INDEX IF NOT EXISTS idx_players_balance ON players(balance DESC);

CREATE TABLE IF NOT EXISTS holdings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(id),
    business_type TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 1,
    profit_per_hour REAL NOT NULL DEFAULT 0.0,
    last_collected TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_holdings_player ON holdings(player_id);

CREATE TABLE IF NOT EXISTS stocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    current_price REAL NOT NULL,
    volatility REAL NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(id),
    stock_id INTEGER NOT NULL REFERENCES stocks(id),
    quantity INTEGER NOT NULL,
    average_price REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_positions_player ON positions(player_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_positions_player_stock ON positions(player_id, stock_id);

CREATE TABLE IF NOT EXISTS ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id INTEGER NOT NULL REFERENCES players(id),
    kind TEXT NOT NULL,
    amount REAL NOT NULL,
    details_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_player_ts ON ledger(player_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_ledger_created ON ledger(created_at DESC);
"#;

/// Handle to the shared game database.
#[derive(Clone)]
pub struct GameDb {
    conn: Arc<Mutex<Connection>>,
}

impl GameDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("open game database at {db_path}"))?;
        conn.execute_batch(SCHEMA_SQL)
            .context("apply game database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Exclusive access to the connection. Hold the guard for the duration
    /// of one unit of work only.
    pub async fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
