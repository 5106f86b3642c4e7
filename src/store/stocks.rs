//! Stock quote and position row helpers.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{StockPosition, StockQuote};

fn map_quote(row: &Row<'_>) -> rusqlite::Result<StockQuote> {
    Ok(StockQuote {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        current_price: row.get(3)?,
        volatility: row.get(4)?,
        description: row.get(5)?,
        last_updated: row.get(6)?,
    })
}

fn map_position(row: &Row<'_>) -> rusqlite::Result<StockPosition> {
    Ok(StockPosition {
        id: row.get(0)?,
        player_id: row.get(1)?,
        stock_id: row.get(2)?,
        quantity: row.get(3)?,
        average_price: row.get(4)?,
    })
}

const QUOTE_COLS: &str = "id, symbol, name, current_price, volatility, description, last_updated";
const POSITION_COLS: &str = "id, player_id, stock_id, quantity, average_price";

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM stocks", [], |row| row.get(0))
}

pub fn insert_quote(
    conn: &Connection,
    symbol: &str,
    name: &str,
    price: f64,
    volatility: f64,
    description: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO stocks (symbol, name, current_price, volatility, description, last_updated)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![symbol, name, price, volatility, description, now],
    )?;
    Ok(())
}

pub fn all(conn: &Connection) -> rusqlite::Result<Vec<StockQuote>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {QUOTE_COLS} FROM stocks ORDER BY symbol"
    ))?;
    let rows = stmt.query_map([], map_quote)?;
    rows.collect()
}

pub fn by_symbol(conn: &Connection, symbol: &str) -> rusqlite::Result<Option<StockQuote>> {
    conn.query_row(
        &format!("SELECT {QUOTE_COLS} FROM stocks WHERE symbol = ?"),
        [symbol],
        map_quote,
    )
    .optional()
}

pub fn set_price(
    conn: &Connection,
    id: i64,
    price: f64,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE stocks SET current_price = ?, last_updated = ? WHERE id = ?",
        params![price, now, id],
    )?;
    Ok(())
}

pub fn position(
    conn: &Connection,
    player_id: i64,
    stock_id: i64,
) -> rusqlite::Result<Option<StockPosition>> {
    conn.query_row(
        &format!("SELECT {POSITION_COLS} FROM positions WHERE player_id = ? AND stock_id = ?"),
        params![player_id, stock_id],
        map_position,
    )
    .optional()
}

/// All of a player's positions joined with their quotes, ordered by symbol.
pub fn positions_for_player(
    conn: &Connection,
    player_id: i64,
) -> rusqlite::Result<Vec<(StockPosition, StockQuote)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT p.id, p.player_id, p.stock_id, p.quantity, p.average_price, \
                s.id, s.symbol, s.name, s.current_price, s.volatility, s.description, s.last_updated \
         FROM positions p JOIN stocks s ON s.id = p.stock_id \
         WHERE p.player_id = ? ORDER BY s.symbol",
    )?;
    let rows = stmt.query_map([player_id], |row| {
        Ok((
            StockPosition {
                id: row.get(0)?,
                player_id: row.get(1)?,
                stock_id: row.get(2)?,
                quantity: row.get(3)?,
                average_price: row.get(4)?,
            },
            StockQuote {
                id: row.get(5)?,
                symbol: row.get(6)?,
                name: row.get(7)?,
                current_price: row.get(8)?,
                volatility: row.get(9)?,
                description: row.get(10)?,
                last_updated: row.get(11)?,
            },
        ))
    })?;
    rows.collect()
}

pub fn insert_position(
    conn: &Connection,
    player_id: i64,
    stock_id: i64,
    quantity: i64,
    average_price: f64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO positions (player_id, stock_id, quantity, average_price)
         VALUES (?, ?, ?, ?)",
        params![player_id, stock_id, quantity, average_price],
    )?;
    Ok(())
}

pub fn update_position(
    conn: &Connection,
    id: i64,
    quantity: i64,
    average_price: f64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE positions SET quantity = ?, average_price = ? WHERE id = ?",
        params![quantity, average_price, id],
    )?;
    Ok(())
}

pub fn delete_position(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM positions WHERE id = ?", [id])?;
    Ok(())
}
