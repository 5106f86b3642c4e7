//! Economy engines. Each engine owns one slice of the rules, is constructed
//! with the shared store plus the immutable catalogs it needs, and runs
//! every mutating operation inside one store transaction.

pub mod bonus;
pub mod business;
pub mod leveling;
pub mod lottery;
pub mod market;
pub mod stats;
pub mod transfer;

pub use bonus::{BonusEngine, BonusOutcome};
pub use business::{BusinessEngine, CollectOutcome, PurchaseOutcome, UpgradeOutcome};
pub use leveling::{LevelProgress, LevelingEngine};
pub use lottery::{LotteryAward, LotteryEngine, PrizeTier};
pub use market::{MarketSimulator, PriceMove, SimSeed, TickSummary, TradeOutcome};
pub use stats::{EconomyStats, LargeTransaction, ReportingEngine, TopPlayer};
pub use transfer::{TransferEngine, TransferOutcome};
