//! Business holding row helpers.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::BusinessHolding;

fn map_holding(row: &Row<'_>) -> rusqlite::Result<BusinessHolding> {
    Ok(BusinessHolding {
        id: row.get(0)?,
        player_id: row.get(1)?,
        business_type: row.get(2)?,
        level: row.get(3)?,
        profit_per_hour: row.get(4)?,
        last_collected: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const HOLDING_COLS: &str =
    "id, player_id, business_type, level, profit_per_hour, last_collected, created_at";

pub fn insert(
    conn: &Connection,
    player_id: i64,
    business_type: &str,
    profit_per_hour: f64,
    now: DateTime<Utc>,
) -> rusqlite::Result<BusinessHolding> {
    conn.execute(
        "INSERT INTO holdings (player_id, business_type, level, profit_per_hour, last_collected, created_at)
         VALUES (?, ?, 1, ?, ?, ?)",
        params![player_id, business_type, profit_per_hour, now, now],
    )?;
    Ok(BusinessHolding {
        id: conn.last_insert_rowid(),
        player_id,
        business_type: business_type.to_string(),
        level: 1,
        profit_per_hour,
        last_collected: now,
        created_at: now,
    })
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<BusinessHolding>> {
    conn.query_row(
        &format!("SELECT {HOLDING_COLS} FROM holdings WHERE id = ?"),
        [id],
        map_holding,
    )
    .optional()
}

pub fn for_player(conn: &Connection, player_id: i64) -> rusqlite::Result<Vec<BusinessHolding>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {HOLDING_COLS} FROM holdings WHERE player_id = ? ORDER BY id"
    ))?;
    let rows = stmt.query_map([player_id], map_holding)?;
    rows.collect()
}

pub fn count_for_player(conn: &Connection, player_id: i64) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM holdings WHERE player_id = ?",
        [player_id],
        |row| row.get(0),
    )
}

/// Bump the level and refresh the cached profit rate together, so the cache
/// can never drift from the level it was derived from.
pub fn set_level(
    conn: &Connection,
    id: i64,
    level: u32,
    profit_per_hour: f64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE holdings SET level = ?, profit_per_hour = ? WHERE id = ?",
        params![level, profit_per_hour, id],
    )?;
    Ok(())
}

pub fn set_last_collected(
    conn: &Connection,
    id: i64,
    collected_at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE holdings SET last_collected = ? WHERE id = ?",
        params![collected_at, id],
    )?;
    Ok(())
}
