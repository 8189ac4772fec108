//! Ledger error types

use thiserror::Error;

use crate::Timestamp;

/// Errors raised by ledger actions.
///
/// Every variant is fatal to the invocation that produced it; state is
/// validated before it is mutated, so a returned error means nothing changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Token with symbol already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing required authority of {0}")]
    Unauthorized(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Symbol precision mismatch: expected {expected}, got {got}")]
    SymbolMismatch { expected: String, got: String },

    #[error("Quantity exceeds available supply: requested {requested}, available {available}")]
    SupplyExceeded { requested: i64, available: i64 },

    #[error("Overdrawn balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("Balance of {0} must be initialized before mining")]
    NotInitialized(String),

    #[error("Cannot transfer to self")]
    SelfTransferDenied,

    #[error("Transfer denied by policy: {0}")]
    PolicyDenied(String),

    #[error("Memo has more than {max} bytes: {len}")]
    MemoTooLong { len: usize, max: usize },

    #[error("Cannot close because the balance is not zero: {0}")]
    BalanceNotEmpty(String),

    #[error("Account does not exist: {0}")]
    AccountNotFound(String),

    #[error("Invalid account name: {0}")]
    InvalidName(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Reward time {at} precedes last reward at {last}")]
    RewardTimeRegressed { at: Timestamp, last: Timestamp },

    #[error("Arithmetic overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
