//! Mining contract
//!
//! Dispatches actions against the token registry with all-or-nothing
//! semantics. Each invocation runs on a staged copy of the ledger; the
//! effects it queues are executed afterwards under the contract's own
//! authority, and the copy only replaces the committed ledger if the action
//! and every effect succeed.

use serde::{Deserialize, Serialize};
use udao_core::{
    AccountDirectory, Asset, AuthContext, LedgerError, Name, Result, Symbol, SymbolCode,
    SupplyRecord, Timestamp, TokenRegistry,
};

use crate::effects::{Effect, Outbox};
use crate::scheduler::{Deposit, MiningOutcome, RewardScheduler};

/// Top-level actions accepted by the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Create {
        issuer: Name,
        max_supply: Asset,
    },
    Issue {
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Retire {
        quantity: Asset,
        memo: String,
    },
    Transfer {
        from: Name,
        to: Name,
        quantity: Asset,
        memo: String,
    },
    Open {
        owner: Name,
        symbol: Symbol,
        payer: Name,
    },
    Close {
        owner: Name,
        symbol: Symbol,
    },
    SetupMiner {
        user: Name,
        symbol: Symbol,
    },
    /// Transfer notification from the deposit ledger
    Notify(Deposit),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Issue { .. } => "issue",
            Action::Retire { .. } => "retire",
            Action::Transfer { .. } => "transfer",
            Action::Open { .. } => "open",
            Action::Close { .. } => "close",
            Action::SetupMiner { .. } => "setupminer",
            Action::Notify(_) => "notify",
        }
    }
}

/// Result of a committed invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Internal effects that ran, in order
    pub executed: Vec<Effect>,
    /// Effects addressed to other ledgers, for the host to deliver
    pub external: Vec<Effect>,
    pub mining: Option<MiningOutcome>,
}

#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub contract: Name,
    pub deposit_contract: Name,
    /// Mined symbol; also the protected symbol
    pub reward_symbol: Symbol,
}

pub struct MiningContract<D: AccountDirectory> {
    registry: TokenRegistry,
    scheduler: RewardScheduler,
    accounts: D,
}

impl<D: AccountDirectory> MiningContract<D> {
    pub fn new(config: ContractConfig, accounts: D) -> Self {
        let registry = TokenRegistry::new(config.contract.clone())
            .with_protected_symbol(config.reward_symbol.code().clone());
        Self::with_registry(config, registry, accounts)
    }

    /// Wraps a registry loaded from storage
    pub fn with_registry(config: ContractConfig, registry: TokenRegistry, accounts: D) -> Self {
        let scheduler = RewardScheduler::new(
            config.contract,
            config.deposit_contract,
            config.reward_symbol,
        );
        Self {
            registry,
            scheduler,
            accounts,
        }
    }

    pub fn contract(&self) -> &Name {
        self.registry.contract()
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Runs one invocation to completion or not at all
    pub fn apply(&mut self, action: Action, auth: &AuthContext, now: Timestamp) -> Result<Receipt> {
        let action_name = action.name();
        let mut staged = self.registry.clone();

        match self.run(&mut staged, action, auth, now) {
            Ok(receipt) => {
                self.registry = staged;
                Ok(receipt)
            }
            Err(e) => {
                log::warn!("{} rolled back: {}", action_name, e);
                Err(e)
            }
        }
    }

    pub fn query_supply(&self, contract: &Name, code: &SymbolCode) -> Result<&SupplyRecord> {
        self.ensure_self(contract)?;
        self.registry.query_supply(code)
    }

    pub fn query_last_reward_time(&self, contract: &Name, code: &SymbolCode) -> Result<Timestamp> {
        self.ensure_self(contract)?;
        self.registry.query_last_reward_time(code)
    }

    pub fn balance_of(&self, contract: &Name, owner: &Name, code: &SymbolCode) -> Result<&Asset> {
        self.ensure_self(contract)?;
        self.registry
            .balance_of(owner, code)
            .ok_or_else(|| LedgerError::NotFound(format!("{}:{}", owner, code)))
    }

    fn run(
        &self,
        staged: &mut TokenRegistry,
        action: Action,
        auth: &AuthContext,
        now: Timestamp,
    ) -> Result<Receipt> {
        let mut outbox = Outbox::new();
        let mut receipt = Receipt::default();

        match action {
            Action::Create { issuer, max_supply } => {
                staged.create(auth, issuer, max_supply, now)?;
            }
            Action::Issue { to, quantity, memo } => {
                staged.mint(auth, &to, &quantity, &memo)?;
            }
            Action::Retire { quantity, memo } => {
                staged.burn(auth, &quantity, &memo)?;
            }
            Action::Transfer {
                from,
                to,
                quantity,
                memo,
            } => {
                staged.transfer(auth, &self.accounts, &from, &to, &quantity, &memo)?;
            }
            Action::Open {
                owner,
                symbol,
                payer,
            } => {
                staged.open(auth, &self.accounts, &owner, &symbol, &payer)?;
            }
            Action::Close { owner, symbol } => {
                staged.close(auth, &owner, &symbol)?;
            }
            Action::SetupMiner { user, symbol } => {
                staged.setup_miner(auth, &user, &symbol)?;
            }
            Action::Notify(deposit) => {
                receipt.mining = self.scheduler.on_deposit(staged, &deposit, now, &mut outbox)?;
            }
        }

        let contract_auth = AuthContext::signed_by(self.contract().clone());
        while let Some(effect) = outbox.pop() {
            self.execute(staged, &effect, &contract_auth)?;
            if effect.is_external() {
                receipt.external.push(effect);
            } else {
                receipt.executed.push(effect);
            }
        }

        Ok(receipt)
    }

    fn execute(&self, staged: &mut TokenRegistry, effect: &Effect, auth: &AuthContext) -> Result<()> {
        match effect {
            Effect::ExternalTransfer { .. } => Ok(()),
            Effect::Issue { to, quantity, memo } => staged.mint(auth, to, quantity, memo),
            Effect::Transfer {
                from,
                to,
                quantity,
                memo,
            } => staged.transfer(auth, &self.accounts, from, to, quantity, memo),
        }
    }

    fn ensure_self(&self, contract: &Name) -> Result<()> {
        if contract != self.contract() {
            return Err(LedgerError::NotFound(format!("contract {}", contract)));
        }
        Ok(())
    }
}
