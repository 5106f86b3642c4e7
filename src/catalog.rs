//! Static catalog loading and validation.
//!
//! Catalogs are immutable values loaded once at startup and passed by `Arc`
//! into each engine constructor, so engines stay testable with synthetic
//! data. Loading fails fast on malformed content; the process refuses to
//! start rather than crash mid-operation later.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One entry of the business type catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessType {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub category: String,
    pub base_price: f64,
    pub base_profit_per_hour: f64,
    pub upgrade_multiplier: f64,
    pub max_level: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessCatalog {
    businesses: Vec<BusinessType>,
}

impl BusinessCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read business catalog at {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let catalog: BusinessCatalog =
            serde_json::from_str(raw).context("parse business catalog")?;
        for b in &catalog.businesses {
            if b.base_price <= 0.0 || b.base_profit_per_hour <= 0.0 {
                bail!("business {}: base price and profit must be positive", b.id);
            }
            if b.upgrade_multiplier < 1.0 {
                bail!("business {}: upgrade multiplier below 1.0", b.id);
            }
            if b.max_level == 0 {
                bail!("business {}: max level must be at least 1", b.id);
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&BusinessType> {
        self.businesses.iter().find(|b| b.id == id)
    }

    pub fn all(&self) -> &[BusinessType] {
        &self.businesses
    }

    pub fn by_category(&self, category: &str) -> Vec<&BusinessType> {
        self.businesses
            .iter()
            .filter(|b| b.category == category)
            .collect()
    }
}

/// One entry of the stock catalog; seeds the `stocks` table on first run.
#[derive(Debug, Clone, Deserialize)]
pub struct StockListing {
    pub symbol: String,
    pub name: String,
    pub base_price: f64,
    pub volatility: f64,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockCatalog {
    stocks: Vec<StockListing>,
}

impl StockCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read stock catalog at {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let catalog: StockCatalog = serde_json::from_str(raw).context("parse stock catalog")?;
        for s in &catalog.stocks {
            if s.base_price <= 0.0 {
                bail!("stock {}: base price must be positive", s.symbol);
            }
            if !(0.0..=1.0).contains(&s.volatility) {
                bail!("stock {}: volatility must be within 0..=1", s.symbol);
            }
        }
        Ok(catalog)
    }

    pub fn all(&self) -> &[StockListing] {
        &self.stocks
    }
}

/// One row of the level table.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelRequirement {
    pub level: u32,
    pub exp_required: f64,
    pub business_limit: u32,
}

/// Ordered level table, strictly increasing in level and exp.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelTable {
    level_up_requirements: Vec<LevelRequirement>,
}

impl LevelTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read level table at {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let table: LevelTable = serde_json::from_str(raw).context("parse level table")?;
        for pair in table.level_up_requirements.windows(2) {
            if pair[1].level <= pair[0].level || pair[1].exp_required <= pair[0].exp_required {
                bail!(
                    "level table must be strictly increasing (level {} -> {})",
                    pair[0].level,
                    pair[1].level
                );
            }
        }
        Ok(table)
    }

    pub fn requirements(&self) -> &[LevelRequirement] {
        &self.level_up_requirements
    }

    pub fn requirement(&self, level: u32) -> Option<&LevelRequirement> {
        self.level_up_requirements.iter().find(|r| r.level == level)
    }

    /// Row following `level` in the ordered table, if any.
    pub fn next_after(&self, level: u32) -> Option<&LevelRequirement> {
        let idx = self
            .level_up_requirements
            .iter()
            .position(|r| r.level == level)?;
        self.level_up_requirements.get(idx + 1)
    }

    /// How many businesses a player of `level` may own. Defaults to 1 when
    /// the level is missing from the table.
    pub fn business_limit(&self, level: u32) -> u32 {
        self.requirement(level).map(|r| r.business_limit).unwrap_or(1)
    }
}

/// Announcement thresholds for the event scan. A missing file degrades to
/// defaults; a malformed one is still a startup error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventThresholds {
    pub business_min_amount: f64,
    pub stock_min_amount: f64,
    pub level_up_min_level: u32,
}

impl Default for EventThresholds {
    fn default() -> Self {
        Self {
            business_min_amount: 10_000.0,
            stock_min_amount: 5_000.0,
            level_up_min_level: 10,
        }
    }
}

impl EventThresholds {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read event thresholds at {}", path.display()))?;
        serde_json::from_str(&raw).context("parse event thresholds")
    }
}
