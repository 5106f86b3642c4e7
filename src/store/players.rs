//! Player row helpers. All functions take `&Connection` so they compose
//! inside an engine's transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Player;

fn map_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        balance: row.get(3)?,
        level: row.get(4)?,
        experience: row.get(5)?,
        daily_streak: row.get(6)?,
        last_daily: row.get(7)?,
        total_earned: row.get(8)?,
        total_spent: row.get(9)?,
        is_banned: row.get::<_, i64>(10)? == 1,
        created_at: row.get(11)?,
    })
}

const PLAYER_COLS: &str = "id, external_id, display_name, balance, level, experience, \
     daily_streak, last_daily, total_earned, total_spent, is_banned, created_at";

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Player>> {
    conn.query_row(
        &format!("SELECT {PLAYER_COLS} FROM players WHERE id = ?"),
        [id],
        map_player,
    )
    .optional()
}

pub fn get_by_external(conn: &Connection, external_id: &str) -> rusqlite::Result<Option<Player>> {
    conn.query_row(
        &format!("SELECT {PLAYER_COLS} FROM players WHERE external_id = ?"),
        [external_id],
        map_player,
    )
    .optional()
}

/// Look up a player by external id, creating the account on first contact.
pub fn get_or_create(
    conn: &Connection,
    external_id: &str,
    display_name: &str,
    starting_balance: f64,
) -> rusqlite::Result<Player> {
    if let Some(existing) = get_by_external(conn, external_id)? {
        return Ok(existing);
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO players (external_id, display_name, balance, created_at)
         VALUES (?, ?, ?, ?)",
        params![external_id, display_name, starting_balance, now],
    )?;
    let id = conn.last_insert_rowid();

    Ok(Player {
        id,
        external_id: external_id.to_string(),
        display_name: display_name.to_string(),
        balance: starting_balance,
        level: 1,
        experience: 0.0,
        daily_streak: 0,
        last_daily: None,
        total_earned: 0.0,
        total_spent: 0.0,
        is_banned: false,
        created_at: now,
    })
}

/// Debit a purchase: balance down, lifetime spent up.
pub fn apply_spend(conn: &Connection, id: i64, amount: f64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET balance = balance - ?, total_spent = total_spent + ? WHERE id = ?",
        params![amount, amount, id],
    )?;
    Ok(())
}

/// Credit income: balance up, lifetime earned up.
pub fn apply_earn(conn: &Connection, id: i64, amount: f64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET balance = balance + ?, total_earned = total_earned + ? WHERE id = ?",
        params![amount, amount, id],
    )?;
    Ok(())
}

/// Raw balance adjustment that leaves the lifetime totals alone (transfers).
pub fn adjust_balance(conn: &Connection, id: i64, delta: f64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET balance = balance + ? WHERE id = ?",
        params![delta, id],
    )?;
    Ok(())
}

pub fn add_experience(conn: &Connection, id: i64, amount: f64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET experience = experience + ? WHERE id = ?",
        params![amount, id],
    )?;
    Ok(())
}

pub fn set_level(conn: &Connection, id: i64, level: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET level = ? WHERE id = ?",
        params![level, id],
    )?;
    Ok(())
}

pub fn set_daily(
    conn: &Connection,
    id: i64,
    streak: u32,
    last_daily: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE players SET daily_streak = ?, last_daily = ? WHERE id = ?",
        params![streak, last_daily, id],
    )?;
    Ok(())
}

pub fn top_by_balance(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<Player>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {PLAYER_COLS} FROM players ORDER BY balance DESC LIMIT ?"
    ))?;
    let rows = stmt.query_map([limit as i64], map_player)?;
    rows.collect()
}

/// Players whose last bonus claim is at or after the cutoff.
pub fn active_since(conn: &Connection, cutoff: DateTime<Utc>) -> rusqlite::Result<Vec<Player>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {PLAYER_COLS} FROM players WHERE last_daily IS NOT NULL AND last_daily >= ? \
         ORDER BY id"
    ))?;
    let rows = stmt.query_map([cutoff], map_player)?;
    rows.collect()
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
}

pub fn count_active_since(conn: &Connection, cutoff: DateTime<Utc>) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM players WHERE last_daily IS NOT NULL AND last_daily >= ?",
        [cutoff],
        |row| row.get(0),
    )
}

/// (total balance, total earned, total spent) across all players.
pub fn money_totals(conn: &Connection) -> rusqlite::Result<(f64, f64, f64)> {
    conn.query_row(
        "SELECT COALESCE(SUM(balance), 0.0), COALESCE(SUM(total_earned), 0.0), \
                COALESCE(SUM(total_spent), 0.0) FROM players",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
}
