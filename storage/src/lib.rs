//! UDAO Storage Layer
//!
//! Persists the two ledger record types:
//! - supply records, one row per symbol
//! - balance records, one row per account and symbol
//!
//! Rows live in sled and are rewritten after every committed invocation.
//! Human-readable snapshots can be exported alongside.

pub mod ledger_store;
pub mod snapshot;

pub use ledger_store::LedgerStore;
pub use snapshot::{BalanceRow, LedgerSnapshot, SnapshotStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt row {key}: {reason}")]
    CorruptRow { key: String, reason: String },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Inconsistent ledger: {0}")]
    InvalidLedger(#[from] udao_core::LedgerError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
