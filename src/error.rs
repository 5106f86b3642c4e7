//! Economy Error Types
//!
//! Every variant except `Store` is a request rejection, not a fault: the
//! operation was understood and refused, and the caller gets a
//! human-readable reason plus a stable kind string.

use thiserror::Error;

/// Errors surfaced by the economy engines.
#[derive(Error, Debug)]
pub enum EconomyError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("insufficient funds: need ${needed:.2}, balance ${balance:.2}")]
    InsufficientFunds { needed: f64, balance: f64 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("quantity must be positive and no more than the held amount")]
    InvalidQuantity,

    #[error("business limit for your level reached ({0})")]
    LimitExceeded(u32),

    #[error("business is already at its max level ({0})")]
    MaxLevelReached(u32),

    #[error("daily bonus already claimed today")]
    AlreadyClaimed,

    #[error("cannot transfer money to yourself")]
    SelfTransfer,

    #[error("you do not hold any shares of that stock")]
    NoPosition,

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl EconomyError {
    /// Stable machine-readable kind, for the command layer to branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            EconomyError::NotFound(_) => "not_found",
            EconomyError::InsufficientFunds { .. } => "insufficient_funds",
            EconomyError::InvalidAmount => "invalid_amount",
            EconomyError::InvalidQuantity => "invalid_quantity",
            EconomyError::LimitExceeded(_) => "limit_exceeded",
            EconomyError::MaxLevelReached(_) => "max_level_reached",
            EconomyError::AlreadyClaimed => "already_claimed",
            EconomyError::SelfTransfer => "self_transfer",
            EconomyError::NoPosition => "no_position",
            EconomyError::Store(_) => "store",
        }
    }

    /// True for the rejection variants (everything but storage failures).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, EconomyError::Store(_))
    }
}

pub type EconomyResult<T> = Result<T, EconomyError>;
