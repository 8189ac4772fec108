//! Balance ledger
//!
//! One balance row per (account, symbol). Rows are created lazily by a
//! credit or explicitly by `open`, and only ever removed by `close`; a
//! debit down to zero keeps the row.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::{Asset, Name, Symbol, SymbolCode};
use crate::error::{LedgerError, Result};
use crate::table::Table;

/// Row key: owner plus symbol code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub owner: Name,
    pub code: SymbolCode,
}

impl BalanceKey {
    pub fn new(owner: &Name, code: &SymbolCode) -> Self {
        Self {
            owner: owner.clone(),
            code: code.clone(),
        }
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub amount: Asset,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    rows: Table<BalanceKey, BalanceRecord>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to `owner`, creating a zero row first if needed
    pub fn credit(&mut self, owner: &Name, value: &Asset) -> Result<()> {
        Self::ensure_positive(value)?;
        let key = BalanceKey::new(owner, value.symbol.code());

        let updated = match self.rows.find(&key) {
            Some(row) => row.amount.checked_add(value)?,
            None => value.clone(),
        };

        self.rows
            .find_or_emplace(key, || BalanceRecord {
                amount: Asset::zero(value.symbol.clone()),
            })
            .amount = updated;
        Ok(())
    }

    /// Subtracts `value` from `owner`; the row stays even when it reaches zero
    pub fn debit(&mut self, owner: &Name, value: &Asset) -> Result<()> {
        Self::ensure_positive(value)?;
        let key = BalanceKey::new(owner, value.symbol.code());
        let updated = self.debited(&key, value)?;

        self.rows.get_mut(&key)?.amount = updated;
        Ok(())
    }

    /// Moves `value` between two rows, validating both sides before either changes
    pub fn transfer(&mut self, from: &Name, to: &Name, value: &Asset) -> Result<()> {
        Self::ensure_positive(value)?;
        if from == to {
            return Err(LedgerError::SelfTransferDenied);
        }

        let from_key = BalanceKey::new(from, value.symbol.code());
        let to_key = BalanceKey::new(to, value.symbol.code());

        let from_updated = self.debited(&from_key, value)?;
        let to_updated = match self.rows.find(&to_key) {
            Some(row) => row.amount.checked_add(value)?,
            None => value.clone(),
        };

        self.rows.get_mut(&from_key)?.amount = from_updated;
        self.rows
            .find_or_emplace(to_key, || BalanceRecord {
                amount: Asset::zero(value.symbol.clone()),
            })
            .amount = to_updated;
        Ok(())
    }

    /// Ensures a zero row exists. Returns `true` when a row was created.
    pub fn open(&mut self, owner: &Name, symbol: &Symbol) -> bool {
        let key = BalanceKey::new(owner, symbol.code());
        if self.rows.contains(&key) {
            return false;
        }

        self.rows.find_or_emplace(key, || BalanceRecord {
            amount: Asset::zero(symbol.clone()),
        });
        true
    }

    /// Deletes a zero row
    pub fn close(&mut self, owner: &Name, code: &SymbolCode) -> Result<BalanceRecord> {
        let key = BalanceKey::new(owner, code);
        let row = self.rows.get(&key)?;

        if row.amount.amount != 0 {
            return Err(LedgerError::BalanceNotEmpty(row.amount.to_string()));
        }

        self.rows.erase(&key).ok_or(LedgerError::NotFound(key.to_string()))
    }

    pub fn get(&self, owner: &Name, code: &SymbolCode) -> Result<&BalanceRecord> {
        self.rows.get(&BalanceKey::new(owner, code))
    }

    pub fn balance_of(&self, owner: &Name, code: &SymbolCode) -> Option<&Asset> {
        self.rows
            .find(&BalanceKey::new(owner, code))
            .map(|row| &row.amount)
    }

    pub fn has_record(&self, owner: &Name, code: &SymbolCode) -> bool {
        self.rows.contains(&BalanceKey::new(owner, code))
    }

    /// Sum of every row holding `code`
    pub fn total_for(&self, code: &SymbolCode) -> Result<i64> {
        self.rows
            .iter()
            .filter(|(key, _)| &key.code == code)
            .try_fold(0i64, |total, (_, row)| {
                total
                    .checked_add(row.amount.amount)
                    .ok_or(LedgerError::Overflow)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BalanceKey, &BalanceRecord)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Loads a persisted row as-is
    pub fn insert_row(&mut self, owner: &Name, record: BalanceRecord) {
        let key = BalanceKey::new(owner, record.amount.symbol.code());
        self.rows.upsert(key, record);
    }

    fn debited(&self, key: &BalanceKey, value: &Asset) -> Result<Asset> {
        let available = self.rows.find(key).map(|row| &row.amount);
        match available {
            Some(current) if current.amount >= value.amount => current.checked_sub(value),
            Some(current) => Err(LedgerError::InsufficientBalance {
                requested: value.amount,
                available: current.amount,
            }),
            None => Err(LedgerError::InsufficientBalance {
                requested: value.amount,
                available: 0,
            }),
        }
    }

    fn ensure_positive(value: &Asset) -> Result<()> {
        if !value.is_valid() || !value.is_positive() {
            return Err(LedgerError::InvalidAmount(value.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn udao(amount: i64) -> Asset {
        Asset::new(amount, "8,UDAO".parse().unwrap())
    }

    fn code() -> SymbolCode {
        SymbolCode::new("UDAO").unwrap()
    }

    #[test]
    fn test_credit_creates_row() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&name("alice"), &udao(1000)).unwrap();
        ledger.credit(&name("alice"), &udao(500)).unwrap();

        assert_eq!(ledger.balance_of(&name("alice"), &code()), Some(&udao(1500)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_credit_rejects_non_positive() {
        let mut ledger = BalanceLedger::new();
        assert!(matches!(
            ledger.credit(&name("alice"), &udao(0)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_debit_without_row() {
        let mut ledger = BalanceLedger::new();
        assert_eq!(
            ledger.debit(&name("alice"), &udao(1)),
            Err(LedgerError::InsufficientBalance {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_overdraw_leaves_state_unchanged() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&name("alice"), &udao(100)).unwrap();

        let result = ledger.debit(&name("alice"), &udao(101));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                requested: 101,
                available: 100
            })
        );
        assert_eq!(ledger.balance_of(&name("alice"), &code()), Some(&udao(100)));
    }

    #[test]
    fn test_debit_to_zero_keeps_row() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&name("alice"), &udao(100)).unwrap();
        ledger.debit(&name("alice"), &udao(100)).unwrap();

        assert!(ledger.has_record(&name("alice"), &code()));
        assert_eq!(ledger.balance_of(&name("alice"), &code()), Some(&udao(0)));
    }

    #[test]
    fn test_transfer_conserves_total() {
        let mut ledger = BalanceLedger::new();
        ledger.credit(&name("alice"), &udao(1000)).unwrap();
        ledger.transfer(&name("alice"), &name("bob"), &udao(400)).unwrap();

        assert_eq!(ledger.balance_of(&name("alice"), &code()), Some(&udao(600)));
        assert_eq!(ledger.balance_of(&name("bob"), &code()), Some(&udao(400)));
        assert_eq!(ledger.total_for(&code()), Ok(1000));

        assert_eq!(
            ledger.transfer(&name("bob"), &name("bob"), &udao(1)),
            Err(LedgerError::SelfTransferDenied)
        );
    }

    #[test]
    fn test_open_and_close() {
        let mut ledger = BalanceLedger::new();
        let symbol: Symbol = "8,UDAO".parse().unwrap();

        assert!(ledger.open(&name("alice"), &symbol));
        assert!(!ledger.open(&name("alice"), &symbol));

        ledger.credit(&name("alice"), &udao(5)).unwrap();
        assert!(matches!(
            ledger.close(&name("alice"), &code()),
            Err(LedgerError::BalanceNotEmpty(_))
        ));

        ledger.debit(&name("alice"), &udao(5)).unwrap();
        ledger.close(&name("alice"), &code()).unwrap();
        assert!(!ledger.has_record(&name("alice"), &code()));

        assert!(matches!(
            ledger.close(&name("alice"), &code()),
            Err(LedgerError::NotFound(_))
        ));
    }
}
