//! Magnate - persistent multi-player tycoon economy engine
//!
//! Startup order: environment + logging, static catalogs (fail fast),
//! store, engines, stock seeding, then the scheduler that drives the
//! market, the lottery and the reporting jobs until ctrl-c.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc, Weekday};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magnate_backend::{
    catalog::{BusinessCatalog, EventThresholds, LevelTable, StockCatalog},
    config::Config,
    economy::{
        lottery::default_tiers, LotteryEngine, MarketSimulator, ReportingEngine, SimSeed,
    },
    notify::{self, LogNotifier, Notifier},
    scheduler::{Cadence, Scheduler},
    store::GameDb,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing();

    info!("🏙️  Magnate economy engine starting");

    // Static catalogs: refuse to start on malformed data rather than crash
    // mid-operation later.
    let businesses = Arc::new(
        BusinessCatalog::load(&config.config_dir.join("businesses.json"))
            .context("load business catalog")?,
    );
    let stocks = Arc::new(
        StockCatalog::load(&config.config_dir.join("stocks.json"))
            .context("load stock catalog")?,
    );
    let levels = Arc::new(
        LevelTable::load(&config.config_dir.join("levels.json")).context("load level table")?,
    );
    let thresholds = EventThresholds::load(&config.config_dir.join("events.json"))
        .context("load event thresholds")?;
    info!(
        "📚 Catalogs loaded: {} businesses, {} stocks, {} levels",
        businesses.all().len(),
        stocks.all().len(),
        levels.requirements().len()
    );

    let db = Arc::new(GameDb::new(&config.database_path)?);
    info!("💾 Database ready at {}", config.database_path);

    let market = Arc::new(MarketSimulator::new(
        db.clone(),
        stocks,
        levels.clone(),
        config.tax_rate,
        SimSeed::from_option(config.market_seed),
    ));
    let seeded = market.seed_stocks().await?;
    if seeded > 0 {
        info!("📈 Seeded {seeded} stocks from the catalog");
    }

    let lottery = Arc::new(LotteryEngine::new(
        db.clone(),
        default_tiers(),
        SimSeed::from_option(config.lottery_seed),
    ));
    let reporting = Arc::new(ReportingEngine::new(db.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let mut scheduler = Scheduler::new();

    // Market tick on a fixed interval.
    {
        let market = market.clone();
        scheduler.add_job("market_tick", Cadence::Every(config.stock_update_interval), move || {
            let market = market.clone();
            async move {
                let summary = market.tick().await?;
                info!(
                    "📊 Market tick: trend {:+.3}, {} symbols repriced",
                    summary.trend,
                    summary.moves.len()
                );
                Ok(())
            }
        });
    }

    // Daily digest to the admin list at midnight UTC.
    {
        let reporting = reporting.clone();
        let notifier = notifier.clone();
        let admin_ids = config.admin_ids.clone();
        scheduler.add_job(
            "daily_digest",
            Cadence::DailyAt { hour: 0, minute: 0 },
            move || {
                let reporting = reporting.clone();
                let notifier = notifier.clone();
                let admin_ids = admin_ids.clone();
                async move {
                    if admin_ids.is_empty() {
                        return Ok(());
                    }
                    let stats = reporting.economy_stats(Utc::now()).await?;
                    let digest = notify::format_daily_digest(&stats);
                    for admin in &admin_ids {
                        notify::send_best_effort(notifier.as_ref(), admin, &digest).await;
                    }
                    Ok(())
                }
            },
        );
    }

    // Weekly lottery, Sunday 20:00 UTC.
    {
        let lottery = lottery.clone();
        let notifier = notifier.clone();
        scheduler.add_job(
            "weekly_lottery",
            Cadence::WeeklyAt {
                weekday: Weekday::Sun,
                hour: 20,
                minute: 0,
            },
            move || {
                let lottery = lottery.clone();
                let notifier = notifier.clone();
                async move {
                    let awards = lottery.run_weekly(Utc::now()).await?;
                    if awards.is_empty() {
                        info!("🎟️  Lottery skipped: no active players this week");
                    } else {
                        info!("🎟️  Lottery paid out {} prizes", awards.len());
                        notify::publish_lottery_results(notifier.as_ref(), &awards).await;
                    }
                    Ok(())
                }
            },
        );
    }

    // Hourly scan for announce-worthy transactions.
    {
        let reporting = reporting.clone();
        let notifier = notifier.clone();
        scheduler.add_job(
            "large_transaction_scan",
            Cadence::Every(std::time::Duration::from_secs(3600)),
            move || {
                let reporting = reporting.clone();
                let notifier = notifier.clone();
                let thresholds = thresholds.clone();
                async move {
                    let since = Utc::now() - ChronoDuration::hours(1);
                    let hits = reporting.large_transactions_since(since, &thresholds).await?;
                    for hit in &hits {
                        let text = notify::format_large_transaction(hit);
                        notify::broadcast_best_effort(notifier.as_ref(), &text).await;
                    }
                    Ok(())
                }
            },
        );
    }

    // Daily top-player board at noon UTC.
    {
        let reporting = reporting.clone();
        let notifier = notifier.clone();
        scheduler.add_job(
            "top_players",
            Cadence::DailyAt { hour: 12, minute: 0 },
            move || {
                let reporting = reporting.clone();
                let notifier = notifier.clone();
                async move {
                    let top = reporting.top_players(5).await?;
                    if !top.is_empty() {
                        let text = notify::format_top_players(&top);
                        notify::broadcast_best_effort(notifier.as_ref(), &text).await;
                    }
                    Ok(())
                }
            },
        );
    }

    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    warn!("🛑 Shutdown signal received");
    scheduler.shutdown();

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magnate_backend=info,magnate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
