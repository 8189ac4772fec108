//! Ledger snapshots
//!
//! A snapshot is a flat copy of every supply and balance row. Each one is
//! written twice: pretty JSON for operators and bincode for fast reloads.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use udao_core::{BalanceRecord, Name, SupplyRecord, Timestamp, TokenRegistry};

use crate::{Result, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub owner: Name,
    pub record: BalanceRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub contract: Name,
    pub taken_at: Timestamp,
    pub supplies: Vec<SupplyRecord>,
    pub balances: Vec<BalanceRow>,
}

impl LedgerSnapshot {
    pub fn capture(registry: &TokenRegistry, taken_at: Timestamp) -> Self {
        let supplies = registry.supplies().cloned().collect();
        let balances = registry
            .balances()
            .iter()
            .map(|(key, record)| BalanceRow {
                owner: key.owner.clone(),
                record: record.clone(),
            })
            .collect();

        Self {
            contract: registry.contract().clone(),
            taken_at,
            supplies,
            balances,
        }
    }

    /// Loads the captured rows into `registry`, then checks that balances
    /// add up to the recorded supply
    pub fn restore_into(self, mut registry: TokenRegistry) -> Result<TokenRegistry> {
        if registry.contract() != &self.contract {
            return Err(StorageError::CorruptRow {
                key: "contract".to_string(),
                reason: format!(
                    "snapshot of {} cannot restore into {}",
                    self.contract,
                    registry.contract()
                ),
            });
        }

        for record in self.supplies {
            registry.insert_supply_row(record);
        }
        for row in self.balances {
            registry.insert_balance_row(&row.owner, row.record);
        }
        registry.verify_conservation()?;
        Ok(registry)
    }
}

/// Directory of named ledger snapshots
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    /// Open the snapshot directory, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        Ok(Self { data_dir })
    }

    /// Returns the path of the JSON copy
    pub fn save(&self, name: &str, snapshot: &LedgerSnapshot) -> Result<PathBuf> {
        let (json_path, bin_path) = self.paths(name);

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&json_path, json)?;

        let bin = bincode::serialize(snapshot)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&bin_path, bin)?;

        log::info!(
            "snapshot {} written: {} supplies, {} balances",
            name,
            snapshot.supplies.len(),
            snapshot.balances.len()
        );
        Ok(json_path)
    }

    /// Reads the bincode copy, falling back to JSON
    pub fn load(&self, name: &str) -> Result<LedgerSnapshot> {
        let (json_path, bin_path) = self.paths(name);

        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            return bincode::deserialize(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        Err(StorageError::SnapshotNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        let (json_path, bin_path) = self.paths(name);
        bin_path.exists() || json_path.exists()
    }

    /// Snapshot names, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            let is_snapshot = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("json") | Some("bin")
            );
            if !is_snapshot {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !names.iter().any(|name| name == stem) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let (json_path, bin_path) = self.paths(name);

        if bin_path.exists() {
            fs::remove_file(bin_path)?;
        }
        if json_path.exists() {
            fs::remove_file(json_path)?;
        }

        Ok(())
    }

    fn paths(&self, name: &str) -> (PathBuf, PathBuf) {
        (
            self.data_dir.join(format!("{}.json", name)),
            self.data_dir.join(format!("{}.bin", name)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use udao_core::{Asset, AuthContext, SymbolCode};

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn udao(amount: i64) -> Asset {
        Asset::new(amount, "8,UDAO".parse().unwrap())
    }

    fn registry() -> TokenRegistry {
        let miner = AuthContext::signed_by(name("udaomining"));
        let mut registry = TokenRegistry::new(name("udaomining"));
        registry
            .create(&miner, name("udaomining"), udao(1_000_000), 1_700_000_000)
            .unwrap();
        registry.mint(&miner, &name("alice"), &udao(700), "").unwrap();
        registry
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snapshot = LedgerSnapshot::capture(&registry(), 1_700_000_600);

        store.save("daily", &snapshot).unwrap();
        let loaded = store.load("daily").unwrap();

        assert_eq!(snapshot, loaded);
        assert_eq!(loaded.balances[0].owner, name("alice"));
    }

    #[test]
    fn test_json_fallback() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snapshot = LedgerSnapshot::capture(&registry(), 1_700_000_600);

        let json_path = store.save("daily", &snapshot).unwrap();
        fs::remove_file(dir.path().join("daily.bin")).unwrap();

        assert!(json_path.exists());
        assert_eq!(store.load("daily").unwrap(), snapshot);
    }

    #[test]
    fn test_restore_into_empty_registry() {
        let original = registry();
        let snapshot = LedgerSnapshot::capture(&original, 1_700_000_600);

        let restored = snapshot
            .restore_into(TokenRegistry::new(name("udaomining")))
            .unwrap();
        let code = SymbolCode::new("UDAO").unwrap();

        assert_eq!(restored.query_supply(&code), original.query_supply(&code));
        assert_eq!(restored.balance_of(&name("alice"), &code), Some(&udao(700)));
        restored.verify_conservation().unwrap();
    }

    #[test]
    fn test_restore_rejects_other_contract() {
        let snapshot = LedgerSnapshot::capture(&registry(), 1_700_000_600);
        let result = snapshot.restore_into(TokenRegistry::new(name("othermining")));
        assert!(matches!(result, Err(StorageError::CorruptRow { .. })));
    }

    #[test]
    fn test_edited_json_is_checked() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snapshot = LedgerSnapshot::capture(&registry(), 1_700_000_600);
        let json_path = store.save("daily", &snapshot).unwrap();
        fs::remove_file(dir.path().join("daily.bin")).unwrap();

        let json = fs::read_to_string(&json_path).unwrap();
        fs::write(&json_path, json.replace("\"precision\": 8", "\"precision\": 200")).unwrap();
        assert!(matches!(
            store.load("daily"),
            Err(StorageError::SerializationError(_))
        ));

        let mut inflated = snapshot.clone();
        inflated.supplies[0].current_supply = udao(701);
        store.save("inflated", &inflated).unwrap();
        let result = store
            .load("inflated")
            .unwrap()
            .restore_into(TokenRegistry::new(name("udaomining")));
        assert!(matches!(result, Err(StorageError::InvalidLedger(_))));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snapshot = LedgerSnapshot::capture(&registry(), 1_700_000_600);

        assert!(!store.has("first"));
        store.save("second", &snapshot).unwrap();
        store.save("first", &snapshot).unwrap();
        assert!(store.has("first"));
        assert_eq!(store.list().unwrap(), vec!["first", "second"]);

        store.delete("first").unwrap();
        assert!(!store.has("first"));
        assert!(matches!(
            store.load("first"),
            Err(StorageError::SnapshotNotFound(_))
        ));
    }
}
