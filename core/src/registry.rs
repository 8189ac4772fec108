//! Token registry
//!
//! Owns one supply record per symbol and the balance ledger behind it.
//! Every action validates its inputs before touching state, so a failed
//! action leaves both supply and balances exactly as they were.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, Name, Symbol, SymbolCode, MAX_MEMO_BYTES};
use crate::auth::{AccountDirectory, AuthContext};
use crate::balances::{BalanceLedger, BalanceRecord};
use crate::error::{LedgerError, Result};
use crate::table::Table;
use crate::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub current_supply: Asset,
    pub max_supply: Asset,
    pub issuer: Name,
    pub created_at: Timestamp,
    /// Start of the first reward interval that has not been minted yet
    pub last_reward_at: Timestamp,
}

impl SupplyRecord {
    /// Amount that may still be issued before the cap is reached
    pub fn available(&self) -> i64 {
        self.max_supply.amount - self.current_supply.amount
    }
}

#[derive(Debug, Clone)]
pub struct TokenRegistry {
    contract: Name,
    protected_symbol: Option<SymbolCode>,
    stats: Table<SymbolCode, SupplyRecord>,
    balances: BalanceLedger,
}

impl TokenRegistry {
    /// `contract` is the registry's own controlling authority
    pub fn new(contract: Name) -> Self {
        Self {
            contract,
            protected_symbol: None,
            stats: Table::new(),
            balances: BalanceLedger::new(),
        }
    }

    /// Restricts peer-to-peer transfers of `code` to the registry's own authority
    pub fn with_protected_symbol(mut self, code: SymbolCode) -> Self {
        self.protected_symbol = Some(code);
        self
    }

    pub fn contract(&self) -> &Name {
        &self.contract
    }

    pub fn protected_symbol(&self) -> Option<&SymbolCode> {
        self.protected_symbol.as_ref()
    }

    pub fn create(
        &mut self,
        auth: &AuthContext,
        issuer: Name,
        max_supply: Asset,
        now: Timestamp,
    ) -> Result<()> {
        auth.require_auth(&self.contract)?;

        if !max_supply.is_valid() {
            return Err(LedgerError::InvalidAmount(format!(
                "invalid supply: {}",
                max_supply
            )));
        }
        if !max_supply.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "max-supply must be positive".to_string(),
            ));
        }

        let code = max_supply.symbol.code().clone();
        let record = SupplyRecord {
            current_supply: Asset::zero(max_supply.symbol.clone()),
            max_supply,
            issuer,
            created_at: now,
            last_reward_at: now,
        };
        let record = self.stats.emplace(code, record)?;

        log::info!(
            "created token {} (issuer {}, created at {})",
            record.max_supply,
            record.issuer,
            record.created_at
        );
        Ok(())
    }

    /// Issues new supply to `to`. Requires the issuer's authority.
    pub fn mint(&mut self, auth: &AuthContext, to: &Name, quantity: &Asset, memo: &str) -> Result<()> {
        check_memo(memo)?;
        let stat = self.stats.get(quantity.symbol.code())?;
        auth.require_auth(&stat.issuer)?;

        check_quantity(quantity, "issue")?;
        stat.current_supply.symbol.ensure_matches(&quantity.symbol)?;

        if quantity.amount > stat.available() {
            return Err(LedgerError::SupplyExceeded {
                requested: quantity.amount,
                available: stat.available(),
            });
        }
        let new_supply = stat.current_supply.checked_add(quantity)?;

        self.balances.credit(to, quantity)?;
        self.stats.get_mut(quantity.symbol.code())?.current_supply = new_supply;

        log::info!("issued {} to {} ({})", quantity, to, memo);
        Ok(())
    }

    /// Retires supply out of the issuer's own balance
    pub fn burn(&mut self, auth: &AuthContext, quantity: &Asset, memo: &str) -> Result<()> {
        check_memo(memo)?;
        let stat = self.stats.get(quantity.symbol.code())?;
        let issuer = stat.issuer.clone();
        auth.require_auth(&issuer)?;

        check_quantity(quantity, "retire")?;
        stat.current_supply.symbol.ensure_matches(&quantity.symbol)?;

        let new_supply = stat.current_supply.checked_sub(quantity)?;
        if new_supply.amount < 0 {
            return Err(LedgerError::InsufficientBalance {
                requested: quantity.amount,
                available: stat.current_supply.amount,
            });
        }

        self.balances.debit(&issuer, quantity)?;
        self.stats.get_mut(quantity.symbol.code())?.current_supply = new_supply;

        log::info!("retired {} from {} ({})", quantity, issuer, memo);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        auth: &AuthContext,
        accounts: &dyn AccountDirectory,
        from: &Name,
        to: &Name,
        quantity: &Asset,
        memo: &str,
    ) -> Result<()> {
        if from == to {
            return Err(LedgerError::SelfTransferDenied);
        }
        auth.require_auth(from)?;
        if !accounts.is_account(to) {
            return Err(LedgerError::AccountNotFound(to.to_string()));
        }

        let stat = self.stats.get(quantity.symbol.code())?;

        if self.protected_symbol.as_ref() == Some(quantity.symbol.code())
            && !auth.has_auth(&self.contract)
        {
            return Err(LedgerError::PolicyDenied(format!(
                "{} cannot be transferred by users",
                quantity.symbol.code()
            )));
        }

        check_quantity(quantity, "transfer")?;
        stat.current_supply.symbol.ensure_matches(&quantity.symbol)?;
        check_memo(memo)?;

        self.balances.transfer(from, to, quantity)?;

        log::info!("transferred {} from {} to {} ({})", quantity, from, to, memo);
        Ok(())
    }

    /// Ensures a zero balance row exists for `owner`; the payer signs
    pub fn open(
        &mut self,
        auth: &AuthContext,
        accounts: &dyn AccountDirectory,
        owner: &Name,
        symbol: &Symbol,
        payer: &Name,
    ) -> Result<()> {
        auth.require_auth(payer)?;
        if !accounts.is_account(owner) {
            return Err(LedgerError::AccountNotFound(owner.to_string()));
        }
        self.open_row(owner, symbol)
    }

    /// Self-service `open` a miner performs before depositing
    pub fn setup_miner(&mut self, auth: &AuthContext, user: &Name, symbol: &Symbol) -> Result<()> {
        auth.require_auth(user)?;
        self.open_row(user, symbol)
    }

    pub fn close(&mut self, auth: &AuthContext, owner: &Name, symbol: &Symbol) -> Result<()> {
        auth.require_auth(owner)?;
        if let Some(stat) = self.stats.find(symbol.code()) {
            stat.current_supply.symbol.ensure_matches(symbol)?;
        }
        self.balances.close(owner, symbol.code())?;

        log::info!("closed {} balance of {}", symbol, owner);
        Ok(())
    }

    pub fn query_supply(&self, code: &SymbolCode) -> Result<&SupplyRecord> {
        self.stats.get(code)
    }

    pub fn query_last_reward_time(&self, code: &SymbolCode) -> Result<Timestamp> {
        Ok(self.stats.get(code)?.last_reward_at)
    }

    /// Moves the reward cursor forward; it never moves backwards
    pub fn advance_last_reward(&mut self, code: &SymbolCode, at: Timestamp) -> Result<()> {
        let stat = self.stats.get_mut(code)?;
        if at < stat.last_reward_at {
            return Err(LedgerError::RewardTimeRegressed {
                at,
                last: stat.last_reward_at,
            });
        }
        stat.last_reward_at = at;
        Ok(())
    }

    pub fn balance_of(&self, owner: &Name, code: &SymbolCode) -> Option<&Asset> {
        self.balances.balance_of(owner, code)
    }

    pub fn balances(&self) -> &BalanceLedger {
        &self.balances
    }

    pub fn supplies(&self) -> impl Iterator<Item = &SupplyRecord> {
        self.stats.iter().map(|(_, record)| record)
    }

    /// Loads a persisted supply row as-is
    pub fn insert_supply_row(&mut self, record: SupplyRecord) {
        let code = record.current_supply.symbol.code().clone();
        self.stats.upsert(code, record);
    }

    /// Loads a persisted balance row as-is
    pub fn insert_balance_row(&mut self, owner: &Name, record: BalanceRecord) {
        self.balances.insert_row(owner, record);
    }

    /// Checks that balances sum to the recorded supply for every symbol
    pub fn verify_conservation(&self) -> Result<()> {
        for (code, stat) in self.stats.iter() {
            let total = self.balances.total_for(code)?;
            if total != stat.current_supply.amount {
                return Err(LedgerError::InvalidAmount(format!(
                    "{} balances sum to {} but supply is {}",
                    code, total, stat.current_supply.amount
                )));
            }
        }
        Ok(())
    }

    fn open_row(&mut self, owner: &Name, symbol: &Symbol) -> Result<()> {
        let stat = self
            .stats
            .get(symbol.code())
            .map_err(|_| LedgerError::NotFound(format!("symbol {} does not exist", symbol)))?;
        stat.current_supply.symbol.ensure_matches(symbol)?;

        if self.balances.open(owner, symbol) {
            log::info!("opened {} balance for {}", symbol, owner);
        }
        Ok(())
    }
}

fn check_memo(memo: &str) -> Result<()> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(LedgerError::MemoTooLong {
            len: memo.len(),
            max: MAX_MEMO_BYTES,
        });
    }
    Ok(())
}

fn check_quantity(quantity: &Asset, verb: &str) -> Result<()> {
    if !quantity.is_valid() {
        return Err(LedgerError::InvalidAmount(format!("invalid quantity: {}", quantity)));
    }
    if !quantity.is_positive() {
        return Err(LedgerError::InvalidAmount(format!(
            "must {} positive quantity",
            verb
        )));
    }
    Ok(())
}
