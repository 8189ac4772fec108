//! UDAO Core Library
//!
//! Ledger primitives for the UDAO mining contract:
//! - fixed-point assets and symbols
//! - the balance ledger (one row per account and symbol)
//! - the token registry (one supply record per symbol)

pub mod asset;
pub mod auth;
pub mod balances;
pub mod error;
pub mod registry;
pub mod table;

// Re-export main types
pub use asset::{Asset, Name, Symbol, SymbolCode, MAX_ASSET_AMOUNT, MAX_MEMO_BYTES, MAX_PRECISION};
pub use auth::{AccountDirectory, AuthContext, KnownAccounts};
pub use balances::{BalanceKey, BalanceLedger, BalanceRecord};
pub use error::{LedgerError, Result};
pub use registry::{SupplyRecord, TokenRegistry};
pub use table::Table;

/// Seconds since the Unix epoch
pub type Timestamp = u64;
