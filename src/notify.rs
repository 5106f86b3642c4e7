//! Notification sink.
//!
//! The chat layer owns real delivery; the core only needs "publish text to
//! the broadcast channel" and "send text to one player", both fire-and-
//! forget. Delivery failures are logged and swallowed: a failed message
//! never rolls back the economic mutation that already committed, and one
//! bad recipient never aborts the rest of a batch.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::economy::{EconomyStats, LargeTransaction, LotteryAward, TopPlayer};
use crate::models::TxKind;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish to the shared broadcast channel.
    async fn broadcast(&self, text: &str) -> Result<()>;

    /// Send to a single player by external id.
    async fn send_direct(&self, external_id: &str, text: &str) -> Result<()>;
}

/// Default sink: everything lands in the log. Stands in for the chat layer
/// in development and in headless runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn broadcast(&self, text: &str) -> Result<()> {
        info!("📢 broadcast: {text}");
        Ok(())
    }

    async fn send_direct(&self, external_id: &str, text: &str) -> Result<()> {
        info!("✉️  to {external_id}: {text}");
        Ok(())
    }
}

/// Best-effort broadcast; failure is logged, never propagated.
pub async fn broadcast_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.broadcast(text).await {
        warn!("broadcast failed: {e:#}");
    }
}

/// Best-effort direct message; one retry-free attempt per recipient.
pub async fn send_best_effort(notifier: &dyn Notifier, external_id: &str, text: &str) {
    if let Err(e) = notifier.send_direct(external_id, text).await {
        warn!("direct message to {external_id} failed: {e:#}");
    }
}

/// Announce lottery results: one broadcast plus a direct message per
/// winner, each best-effort.
pub async fn publish_lottery_results(notifier: &dyn Notifier, awards: &[LotteryAward]) {
    if awards.is_empty() {
        return;
    }

    let mut message = String::from("🎉 WEEKLY LOTTERY RESULTS\n\n");
    for (i, award) in awards.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} — {} (${:.2})\n",
            i + 1,
            award.display_name,
            award.tier,
            award.amount
        ));
    }
    message.push_str("\nCongratulations to the winners! 🎊");
    broadcast_best_effort(notifier, &message).await;

    for award in awards {
        let text = format!(
            "🎉 Congratulations! You won the {} in the weekly lottery!\n💰 ${:.2} has been credited to your balance.",
            award.tier, award.amount
        );
        send_best_effort(notifier, &award.external_id, &text).await;
    }
}

pub fn format_daily_digest(stats: &EconomyStats) -> String {
    let mut message = String::from("📊 DAILY ECONOMY DIGEST\n\n");
    message.push_str(&format!("👥 Players: {}\n", stats.total_players));
    message.push_str(&format!("🎯 Active (24h): {}\n", stats.active_players_24h));
    message.push_str(&format!("💰 Total balance: ${:.2}\n", stats.total_balance));
    message.push_str(&format!("📈 Total earned: ${:.2}\n", stats.total_earned));
    message.push_str(&format!("📉 Total spent: ${:.2}\n", stats.total_spent));
    message.push_str(&format!(
        "🔄 Transactions (24h): {}\n\n",
        stats.ledger_entries_24h
    ));
    message.push_str("🏆 TOP 5 PLAYERS:\n");
    for (i, p) in stats.top_players.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} — ${:.2} (level {})\n",
            i + 1,
            p.display_name,
            p.balance,
            p.level
        ));
    }
    message
}

pub fn format_top_players(top: &[TopPlayer]) -> String {
    let mut message = String::from("🏆 DAILY TOP PLAYERS\n\n");
    for (i, p) in top.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} — ${:.2}\n   Level: {}\n",
            i + 1,
            p.display_name,
            p.balance,
            p.level
        ));
    }
    message
}

pub fn format_large_transaction(tx: &LargeTransaction) -> String {
    let action = match tx.kind {
        TxKind::BusinessPurchase => "bought a business",
        TxKind::BusinessUpgrade => "upgraded a business",
        TxKind::StockBuy => "bought stock",
        TxKind::StockSell => "sold stock",
        _ => "moved money",
    };
    format!(
        "💥 BIG DEAL!\n\n👤 {} {} for ${:.2}",
        tx.player_name,
        action,
        tx.amount.abs()
    )
}

/// Level-ups are only broadcast once they get impressive.
pub async fn announce_level_up(
    notifier: &dyn Notifier,
    display_name: &str,
    new_level: u32,
    min_level: u32,
) {
    if new_level < min_level {
        return;
    }
    let text = format!("🚀 NEW LEVEL!\n\n👤 {display_name} reached level {new_level}");
    broadcast_best_effort(notifier, &text).await;
}
