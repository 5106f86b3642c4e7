//! Append-only ledger helpers. Entries are never updated or deleted; this
//! module deliberately exposes no mutation beyond `append`.

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, Row};

use crate::models::{LedgerEntry, TxDetail, TxKind};

fn map_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let kind_raw: String = row.get(2)?;
    let kind = TxKind::parse(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown transaction kind {kind_raw}").into(),
        )
    })?;
    let details_json: String = row.get(4)?;
    let detail: TxDetail = serde_json::from_str(&details_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        player_id: row.get(1)?,
        kind,
        amount: row.get(3)?,
        detail,
        created_at: row.get(5)?,
    })
}

const ENTRY_COLS: &str = "id, player_id, kind, amount, details_json, created_at";

/// Record one balance-affecting event. `amount` is signed and must equal
/// the balance delta applied to the player in the same transaction.
pub fn append(
    conn: &Connection,
    player_id: i64,
    kind: TxKind,
    amount: f64,
    detail: &TxDetail,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    let details_json = serde_json::to_string(detail)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO ledger (player_id, kind, amount, details_json, created_at)
         VALUES (?, ?, ?, ?, ?)",
        params![player_id, kind.as_str(), amount, details_json, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn recent_for_player(
    conn: &Connection,
    player_id: i64,
    limit: usize,
) -> rusqlite::Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {ENTRY_COLS} FROM ledger WHERE player_id = ? ORDER BY id DESC LIMIT ?"
    ))?;
    let rows = stmt.query_map(params![player_id, limit as i64], map_entry)?;
    rows.collect()
}

pub fn count_since(conn: &Connection, cutoff: DateTime<Utc>) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM ledger WHERE created_at >= ?",
        [cutoff],
        |row| row.get(0),
    )
}

/// Entries since the cutoff whose absolute amount clears `min_abs_amount`.
/// The caller applies any per-kind filtering on top.
pub fn large_since(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    min_abs_amount: f64,
) -> rusqlite::Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {ENTRY_COLS} FROM ledger WHERE created_at >= ? AND ABS(amount) >= ? ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![cutoff, min_abs_amount], map_entry)?;
    rows.collect()
}
