//! Transfer Engine
//!
//! Moves funds between two accounts. The fee comes out of the gross amount
//! and is destroyed — a deliberate economic sink, like the stock sale tax —
//! so the engine is not zero-sum. Each leg gets its own signed ledger entry
//! to keep every account independently auditable.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{EconomyError, EconomyResult},
    models::{round2, TxDetail, TxKind},
    store::{ledger, players, GameDb},
};

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub from_player: i64,
    pub to_player: i64,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
}

pub struct TransferEngine {
    db: Arc<GameDb>,
    fee_rate: f64,
}

impl TransferEngine {
    pub fn new(db: Arc<GameDb>, fee_rate: f64) -> Self {
        Self { db, fee_rate }
    }

    pub async fn transfer(
        &self,
        from_player: i64,
        to_player: i64,
        amount: f64,
    ) -> EconomyResult<TransferOutcome> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EconomyError::InvalidAmount);
        }
        if from_player == to_player {
            return Err(EconomyError::SelfTransfer);
        }

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;

        let sender = players::get(&tx, from_player)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {from_player}")))?;
        let receiver = players::get(&tx, to_player)?
            .ok_or_else(|| EconomyError::NotFound(format!("player {to_player}")))?;

        if sender.balance < amount {
            return Err(EconomyError::InsufficientFunds {
                needed: amount,
                balance: sender.balance,
            });
        }

        let fee = round2(amount * self.fee_rate);
        let net_amount = round2(amount - fee);
        let now = Utc::now();

        // Sender pays the full amount; the receiver gets the net. The fee
        // is credited to no one.
        players::adjust_balance(&tx, from_player, -amount)?;
        players::adjust_balance(&tx, to_player, net_amount)?;

        ledger::append(
            &tx,
            from_player,
            TxKind::TransferOut,
            -amount,
            &TxDetail::TransferOut {
                to_player,
                to_name: receiver.display_name.clone(),
                amount,
                fee,
                net_amount,
            },
            now,
        )?;
        ledger::append(
            &tx,
            to_player,
            TxKind::TransferIn,
            net_amount,
            &TxDetail::TransferIn {
                from_player,
                from_name: sender.display_name.clone(),
                amount,
                fee,
                net_amount,
            },
            now,
        )?;

        tx.commit()?;
        Ok(TransferOutcome {
            from_player,
            to_player,
            amount,
            fee,
            net_amount,
        })
    }
}
