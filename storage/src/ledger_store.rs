//! Sled-based persistence for ledger rows
//!
//! Keys:
//! - `stat:<CODE>` holds a bincode `SupplyRecord`
//! - `accounts:<owner>:<CODE>` holds a bincode `BalanceRecord`

use std::collections::BTreeSet;
use std::path::Path;

use udao_core::{BalanceRecord, Name, SupplyRecord, SymbolCode, TokenRegistry};

use crate::{Result, StorageError};

const STAT_PREFIX: &str = "stat:";
const ACCOUNTS_PREFIX: &str = "accounts:";

#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: sled::Db,
    path: String,
}

impl LedgerStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = sled::open(&path)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open database: {}", e)))?;

        Ok(LedgerStore { db, path: path_str })
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn save_supply(&self, record: &SupplyRecord) -> Result<()> {
        let key = stat_key(record.current_supply.symbol.code());
        self.insert(&key, record)?;
        self.flush()
    }

    pub fn load_supply(&self, code: &SymbolCode) -> Result<Option<SupplyRecord>> {
        self.get(&stat_key(code))
    }

    pub fn save_balance(&self, owner: &Name, record: &BalanceRecord) -> Result<()> {
        let key = balance_key(owner, record.amount.symbol.code());
        self.insert(&key, record)?;
        self.flush()
    }

    pub fn load_balance(&self, owner: &Name, code: &SymbolCode) -> Result<Option<BalanceRecord>> {
        self.get(&balance_key(owner, code))
    }

    /// Returns `true` if a row was removed
    pub fn remove_balance(&self, owner: &Name, code: &SymbolCode) -> Result<bool> {
        let removed = self
            .db
            .remove(balance_key(owner, code).as_bytes())
            .map_err(|e| StorageError::DatabaseError(format!("Failed to remove balance: {}", e)))?;
        self.flush()?;
        Ok(removed.is_some())
    }

    /// Writes every row of the registry in one batch and drops balance rows
    /// that no longer exist (closed accounts)
    pub fn save_registry(&self, registry: &TokenRegistry) -> Result<()> {
        let mut batch = sled::Batch::default();
        let mut live = BTreeSet::new();

        for record in registry.supplies() {
            let key = stat_key(record.current_supply.symbol.code());
            batch.insert(key.as_bytes(), encode(&key, record)?);
        }

        for (row_key, record) in registry.balances().iter() {
            let key = balance_key(&row_key.owner, &row_key.code);
            batch.insert(key.as_bytes(), encode(&key, record)?);
            live.insert(key);
        }

        let mut stale = 0usize;
        for entry in self.db.scan_prefix(ACCOUNTS_PREFIX.as_bytes()) {
            let (key, _) = entry
                .map_err(|e| StorageError::DatabaseError(format!("Failed to scan balances: {}", e)))?;
            let key = String::from_utf8_lossy(&key).to_string();
            if !live.contains(&key) {
                batch.remove(key.as_bytes());
                stale += 1;
            }
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to save ledger: {}", e)))?;
        self.flush()?;

        log::debug!(
            "saved {} supply and {} balance rows to {} ({} removed)",
            registry.supplies().count(),
            live.len(),
            self.path,
            stale
        );
        Ok(())
    }

    /// Loads every persisted row into `registry`, which carries the
    /// contract identity and policy. Fails if balances do not add up to
    /// the recorded supply.
    pub fn load_registry(&self, mut registry: TokenRegistry) -> Result<TokenRegistry> {
        for entry in self.db.scan_prefix(STAT_PREFIX.as_bytes()) {
            let (key, value) = entry
                .map_err(|e| StorageError::DatabaseError(format!("Failed to scan supply: {}", e)))?;
            let key = String::from_utf8_lossy(&key).to_string();
            let record: SupplyRecord = decode(&key, &value)?;
            registry.insert_supply_row(record);
        }

        for entry in self.db.scan_prefix(ACCOUNTS_PREFIX.as_bytes()) {
            let (key, value) = entry
                .map_err(|e| StorageError::DatabaseError(format!("Failed to scan balances: {}", e)))?;
            let key = String::from_utf8_lossy(&key).to_string();
            let owner = owner_from_key(&key)?;
            let record: BalanceRecord = decode(&key, &value)?;
            registry.insert_balance_row(&owner, record);
        }

        registry.verify_conservation()?;
        Ok(registry)
    }

    fn insert<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.db
            .insert(key.as_bytes(), encode(key, value)?)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to save {}: {}", key, e)))?;
        Ok(())
    }

    fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => Ok(Some(decode(key, &data)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::DatabaseError(format!(
                "Failed to load {}: {}",
                key, e
            ))),
        }
    }

    // Flush after every write so committed invocations survive a restart
    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(format!("Failed to flush to disk: {}", e)))?;
        Ok(())
    }
}

fn stat_key(code: &SymbolCode) -> String {
    format!("{}{}", STAT_PREFIX, code)
}

fn balance_key(owner: &Name, code: &SymbolCode) -> String {
    format!("{}{}:{}", ACCOUNTS_PREFIX, owner, code)
}

fn owner_from_key(key: &str) -> Result<Name> {
    let corrupt = |reason: String| StorageError::CorruptRow {
        key: key.to_string(),
        reason,
    };

    let (owner, _code) = key
        .strip_prefix(ACCOUNTS_PREFIX)
        .and_then(|rest| rest.rsplit_once(':'))
        .ok_or_else(|| corrupt("malformed balance key".to_string()))?;
    Name::new(owner).map_err(|e| corrupt(e.to_string()))
}

fn encode<T: serde::Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| StorageError::SerializationError(format!("Failed to serialize {}: {}", key, e)))
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, data: &[u8]) -> Result<T> {
    bincode::deserialize(data).map_err(|e| StorageError::CorruptRow {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
