//! Core data model: players, holdings, stock quotes, positions and the
//! append-only ledger.
//!
//! Rows map 1:1 onto the SQLite tables in `store`. The ledger detail payload
//! is a closed tagged union (`TxDetail`) so historical records stay
//! strongly typed per transaction kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Round a monetary value to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Player account row.
///
/// Created on first contact, never hard-deleted. `balance` may only go
/// negative through a bug: every debit path checks funds first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    /// Opaque stable id supplied by the chat layer.
    pub external_id: String,
    pub display_name: String,
    pub balance: f64,
    pub level: u32,
    pub experience: f64,
    pub daily_streak: u32,
    pub last_daily: Option<DateTime<Utc>>,
    pub total_earned: f64,
    pub total_spent: f64,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

/// A player's owned instance of a business type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHolding {
    pub id: i64,
    pub player_id: i64,
    pub business_type: String,
    pub level: u32,
    /// Cache of `profit_per_hour(type, level)`; recomputed on level change.
    pub profit_per_hour: f64,
    pub last_collected: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Current market state of one stock symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub volatility: f64,
    pub description: String,
    pub last_updated: DateTime<Utc>,
}

/// A player's aggregate position in one symbol, average-cost accounted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPosition {
    pub id: i64,
    pub player_id: i64,
    pub stock_id: i64,
    pub quantity: i64,
    pub average_price: f64,
}

/// Transaction kinds recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    BusinessPurchase,
    BusinessUpgrade,
    ProfitCollection,
    StockBuy,
    StockSell,
    DailyBonus,
    TransferIn,
    TransferOut,
    LotteryWin,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::BusinessPurchase => "business_purchase",
            TxKind::BusinessUpgrade => "business_upgrade",
            TxKind::ProfitCollection => "profit_collection",
            TxKind::StockBuy => "stock_buy",
            TxKind::StockSell => "stock_sell",
            TxKind::DailyBonus => "daily_bonus",
            TxKind::TransferIn => "transfer_in",
            TxKind::TransferOut => "transfer_out",
            TxKind::LotteryWin => "lottery_win",
        }
    }

    pub fn parse(s: &str) -> Option<TxKind> {
        Some(match s {
            "business_purchase" => TxKind::BusinessPurchase,
            "business_upgrade" => TxKind::BusinessUpgrade,
            "profit_collection" => TxKind::ProfitCollection,
            "stock_buy" => TxKind::StockBuy,
            "stock_sell" => TxKind::StockSell,
            "daily_bonus" => TxKind::DailyBonus,
            "transfer_in" => TxKind::TransferIn,
            "transfer_out" => TxKind::TransferOut,
            "lottery_win" => TxKind::LotteryWin,
            _ => return None,
        })
    }
}

/// One collected business inside a `ProfitCollection` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedBusiness {
    pub business_type: String,
    pub profit: f64,
    pub hours: f64,
    pub level: u32,
}

/// Structured detail payload, one variant per transaction kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxDetail {
    BusinessPurchase {
        business_type: String,
        business_name: String,
        level: u32,
    },
    BusinessUpgrade {
        business_type: String,
        business_name: String,
        old_level: u32,
        new_level: u32,
    },
    ProfitCollection {
        breakdown: Vec<CollectedBusiness>,
    },
    StockBuy {
        symbol: String,
        stock_name: String,
        quantity: i64,
        price_per_share: f64,
        total_cost: f64,
    },
    StockSell {
        symbol: String,
        stock_name: String,
        quantity: i64,
        price_per_share: f64,
        total_revenue: f64,
        tax: f64,
        net_revenue: f64,
    },
    DailyBonus {
        streak: u32,
        streak_multiplier: f64,
        level_multiplier: f64,
    },
    TransferOut {
        to_player: i64,
        to_name: String,
        amount: f64,
        fee: f64,
        net_amount: f64,
    },
    TransferIn {
        from_player: i64,
        from_name: String,
        amount: f64,
        fee: f64,
        net_amount: f64,
    },
    LotteryWin {
        tier: String,
    },
}

/// Immutable audit record of a balance-affecting event. Append-only; the
/// signed `amount` equals the balance delta applied to `player_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub player_id: i64,
    pub kind: TxKind,
    pub amount: f64,
    pub detail: TxDetail,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(57.49999), 57.5);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn tx_kind_round_trips_through_strings() {
        for kind in [
            TxKind::BusinessPurchase,
            TxKind::BusinessUpgrade,
            TxKind::ProfitCollection,
            TxKind::StockBuy,
            TxKind::StockSell,
            TxKind::DailyBonus,
            TxKind::TransferIn,
            TxKind::TransferOut,
            TxKind::LotteryWin,
        ] {
            assert_eq!(TxKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TxKind::parse("job_offer"), None);
    }

    #[test]
    fn tx_detail_serializes_tagged_by_kind() {
        let detail = TxDetail::DailyBonus {
            streak: 3,
            streak_multiplier: 1.3,
            level_multiplier: 1.05,
        };
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("\"kind\":\"daily_bonus\""));
        assert!(json.contains("\"streak\":3"));

        let back: TxDetail = serde_json::from_str(&json).unwrap();
        match back {
            TxDetail::DailyBonus { streak, .. } => assert_eq!(streak, 3),
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
