//! Keyed row storage
//!
//! A map with the two access patterns the ledger needs: get-or-fail for
//! rows that must exist, and first-writer-wins creation for new rows.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone)]
pub struct Table<K, V> {
    rows: BTreeMap<K, V>,
}

impl<K: Ord + Clone + Display, V> Table<K, V> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    /// Row that must exist; `NotFound` otherwise
    pub fn get(&self, key: &K) -> Result<&V> {
        self.rows
            .get(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        self.rows
            .get_mut(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))
    }

    /// Creates a row; the first writer wins and later attempts fail
    pub fn emplace(&mut self, key: K, row: V) -> Result<&mut V> {
        if self.rows.contains_key(&key) {
            return Err(LedgerError::AlreadyExists(key.to_string()));
        }
        Ok(self.rows.entry(key).or_insert(row))
    }

    pub fn find_or_emplace(&mut self, key: K, row: impl FnOnce() -> V) -> &mut V {
        self.rows.entry(key).or_insert_with(row)
    }

    /// Writes a row unconditionally, used when loading persisted rows
    pub fn upsert(&mut self, key: K, row: V) -> Option<V> {
        self.rows.insert(key, row)
    }

    pub fn erase(&mut self, key: &K) -> Option<V> {
        self.rows.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<K: Ord + Clone + Display, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let mut table: Table<String, u64> = Table::new();
        table.emplace("UDAO".to_string(), 1).unwrap();

        let second = table.emplace("UDAO".to_string(), 2);
        assert_eq!(
            second.err(),
            Some(LedgerError::AlreadyExists("UDAO".to_string()))
        );
        assert_eq!(table.find(&"UDAO".to_string()), Some(&1));
    }

    #[test]
    fn test_get_or_fail() {
        let mut table: Table<String, u64> = Table::new();
        assert!(matches!(
            table.get(&"EOS".to_string()),
            Err(LedgerError::NotFound(_))
        ));

        *table.find_or_emplace("EOS".to_string(), || 0) += 5;
        *table.find_or_emplace("EOS".to_string(), || 0) += 5;
        assert_eq!(table.get(&"EOS".to_string()), Ok(&10));

        assert_eq!(table.erase(&"EOS".to_string()), Some(10));
        assert!(table.is_empty());
    }
}
