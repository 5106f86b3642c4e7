//! Runtime configuration.
//!
//! Every knob comes from the environment with a sensible default, so the
//! binary starts with nothing but a `.env` (or nothing at all). Static game
//! data lives in the JSON catalogs under `CONFIG_DIR`, not here.

use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub config_dir: PathBuf,
    /// Balance granted when a player account is first created.
    pub starting_balance: f64,
    /// Tax withheld on stock sale proceeds. Destroyed, not redistributed.
    pub tax_rate: f64,
    /// Fee withheld from transfers. Destroyed, not redistributed.
    pub transfer_fee_rate: f64,
    pub daily_bonus_base: f64,
    pub stock_update_interval: Duration,
    /// Pin the market RNG for reproducible price paths; None = OS entropy.
    pub market_seed: Option<u64>,
    pub lottery_seed: Option<u64>,
    /// External ids that receive the daily admin digest.
    pub admin_ids: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./magnate.db".to_string());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./configs"));

        let starting_balance = parse_f64("STARTING_BALANCE", 1000.0);
        let tax_rate = parse_f64("TAX_RATE", 0.05);
        let transfer_fee_rate = parse_f64("TRANSFER_FEE_RATE", 0.01);
        let daily_bonus_base = parse_f64("DAILY_BONUS_BASE", 100.0);

        let interval_minutes = env::var("STOCK_UPDATE_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(15);

        let market_seed = env::var("MARKET_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());
        let lottery_seed = env::var("LOTTERY_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());

        let admin_ids = env::var("ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_path,
            config_dir,
            starting_balance,
            tax_rate,
            transfer_fee_rate,
            daily_bonus_base,
            stock_update_interval: Duration::from_secs(interval_minutes * 60),
            market_seed,
            lottery_seed,
            admin_ids,
        }
    }
}

fn parse_f64(var: &str, default: f64) -> f64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Scoped to variables the test environment never sets.
        let config = Config::from_env();
        assert!(config.starting_balance > 0.0);
        assert!(config.tax_rate >= 0.0 && config.tax_rate < 1.0);
        assert!(config.stock_update_interval >= Duration::from_secs(60));
    }

    #[test]
    fn parse_f64_rejects_garbage() {
        env::set_var("MAGNATE_TEST_RATE", "not-a-number");
        assert_eq!(parse_f64("MAGNATE_TEST_RATE", 0.25), 0.25);
        env::set_var("MAGNATE_TEST_RATE", "0.5");
        assert_eq!(parse_f64("MAGNATE_TEST_RATE", 0.25), 0.5);
        env::remove_var("MAGNATE_TEST_RATE");
    }
}
