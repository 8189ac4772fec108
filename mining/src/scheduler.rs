//! Reward scheduler
//!
//! Runs when a deposit notification reaches the contract. There is no timer:
//! the schedule is only checked when someone deposits, so a single trigger
//! may have several reward intervals to catch up on.

use serde::{Deserialize, Serialize};
use udao_core::{Asset, LedgerError, Name, Result, Symbol, Timestamp, TokenRegistry};

use crate::constants::{PAYOUT_DIVISOR, REFUND_MEMO, REWARD_INTERVAL};
use crate::effects::{Effect, Outbox};
use crate::rewards::reward_for_tier;

/// Transfer notification from the external deposit ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub token_contract: Name,
    pub from: Name,
    pub to: Name,
    pub quantity: Asset,
    pub memo: String,
}

/// Tranches owed for the time elapsed since the last reward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranchePlan {
    pub tranche_count: u64,
    pub unit_reward: Asset,
    pub issued: Asset,
    pub next_reward_at: Timestamp,
}

/// Computes the tranches owed at `now`, or `None` when less than one
/// interval has passed. The cursor advances by whole intervals so any
/// remainder carries over to the next trigger.
pub fn plan_tranches(
    last_reward_at: Timestamp,
    now: Timestamp,
    supply: &Asset,
) -> Result<Option<TranchePlan>> {
    let elapsed = now.saturating_sub(last_reward_at);
    if elapsed < REWARD_INTERVAL {
        return Ok(None);
    }

    let tranche_count = elapsed / REWARD_INTERVAL;
    let unit_reward = reward_for_tier(supply);
    let count = i64::try_from(tranche_count).map_err(|_| LedgerError::Overflow)?;
    let issued = unit_reward.checked_mul(count)?;
    let next_reward_at = tranche_count
        .checked_mul(REWARD_INTERVAL)
        .and_then(|span| last_reward_at.checked_add(span))
        .ok_or(LedgerError::Overflow)?;

    Ok(Some(TranchePlan {
        tranche_count,
        unit_reward,
        issued,
        next_reward_at,
    }))
}

/// What one accepted deposit did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiningOutcome {
    pub tranches: u64,
    pub issued: Option<Asset>,
    pub payout: Option<Asset>,
}

#[derive(Debug, Clone)]
pub struct RewardScheduler {
    contract: Name,
    deposit_contract: Name,
    reward_symbol: Symbol,
}

impl RewardScheduler {
    pub fn new(contract: Name, deposit_contract: Name, reward_symbol: Symbol) -> Self {
        Self {
            contract,
            deposit_contract,
            reward_symbol,
        }
    }

    /// Only deposits from the deposit ledger, addressed to the contract and
    /// not sent by it, trigger mining
    pub fn accepts(&self, deposit: &Deposit) -> bool {
        deposit.token_contract == self.deposit_contract
            && deposit.to == self.contract
            && deposit.from != self.contract
    }

    /// Handles a deposit: refunds it, mints any owed tranches to the
    /// contract and pays the depositor a slice of the contract balance.
    ///
    /// Effects are queued, not executed. The reward cursor is the only state
    /// changed here, and only once every check has passed. Returns `None`
    /// for notifications that are not mining triggers.
    pub fn on_deposit(
        &self,
        registry: &mut TokenRegistry,
        deposit: &Deposit,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> Result<Option<MiningOutcome>> {
        if !self.accepts(deposit) {
            log::debug!(
                "ignoring {} notification {} -> {}",
                deposit.token_contract,
                deposit.from,
                deposit.to
            );
            return Ok(None);
        }

        let code = self.reward_symbol.code();
        if !registry.balances().has_record(&deposit.from, code) {
            return Err(LedgerError::NotInitialized(deposit.from.to_string()));
        }

        let mut effects = vec![Effect::ExternalTransfer {
            contract: deposit.token_contract.clone(),
            from: self.contract.clone(),
            to: deposit.from.clone(),
            quantity: deposit.quantity.clone(),
            memo: REFUND_MEMO.to_string(),
        }];

        let stat = registry.query_supply(code)?;
        stat.current_supply.symbol.ensure_matches(&self.reward_symbol)?;
        let mut balance = registry
            .balance_of(&self.contract, code)
            .cloned()
            .ok_or_else(|| LedgerError::NotInitialized(self.contract.to_string()))?;

        let mut outcome = MiningOutcome::default();
        let plan = plan_tranches(stat.last_reward_at, now, &stat.current_supply)?;

        match &plan {
            Some(plan) => {
                if plan.issued.is_positive() {
                    if plan.issued.amount > stat.available() {
                        return Err(LedgerError::SupplyExceeded {
                            requested: plan.issued.amount,
                            available: stat.available(),
                        });
                    }

                    effects.push(Effect::Issue {
                        to: self.contract.clone(),
                        quantity: plan.issued.clone(),
                        memo: format!("Issue {}", code),
                    });
                    // The issue runs later; account for it now
                    balance = balance.checked_add(&plan.issued)?;
                    outcome.issued = Some(plan.issued.clone());
                }
                outcome.tranches = plan.tranche_count;

                log::info!(
                    "{} tranche(s) of {} owed since {}, minting {}",
                    plan.tranche_count,
                    plan.unit_reward,
                    stat.last_reward_at,
                    plan.issued
                );
            }
            None => {
                log::debug!(
                    "{}s since last reward at {}, nothing to mint",
                    now.saturating_sub(stat.last_reward_at),
                    stat.last_reward_at
                );
            }
        }

        let payout = balance.checked_div(PAYOUT_DIVISOR)?;
        if payout.is_positive() {
            effects.push(Effect::Transfer {
                from: self.contract.clone(),
                to: deposit.from.clone(),
                quantity: payout.clone(),
                memo: format!("Mine {}", code),
            });
            outcome.payout = Some(payout);
        }

        if let Some(plan) = plan {
            registry.advance_last_reward(code, plan.next_reward_at)?;
        }
        for effect in effects {
            outbox.push(effect);
        }

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udao_core::{AuthContext, SymbolCode};

    const CREATED_AT: Timestamp = 1_700_000_000;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn udao(amount: i64) -> Asset {
        Asset::new(amount, "8,UDAO".parse().unwrap())
    }

    fn code() -> SymbolCode {
        SymbolCode::new("UDAO").unwrap()
    }

    fn scheduler() -> RewardScheduler {
        RewardScheduler::new(
            name("udaomining"),
            name("eosio.token"),
            "8,UDAO".parse().unwrap(),
        )
    }

    fn deposit(from: &str) -> Deposit {
        Deposit {
            token_contract: name("eosio.token"),
            from: name(from),
            to: name("udaomining"),
            quantity: "1.0000 UOS".parse().unwrap(),
            memo: "mine".to_string(),
        }
    }

    fn registry() -> TokenRegistry {
        let miner = AuthContext::signed_by(name("udaomining"));
        let alice = AuthContext::signed_by(name("alice"));
        let symbol: Symbol = "8,UDAO".parse().unwrap();
        let mut registry = TokenRegistry::new(name("udaomining"));
        registry
            .create(&miner, name("udaomining"), "21000000.00000000 UDAO".parse().unwrap(), CREATED_AT)
            .unwrap();
        registry.setup_miner(&miner, &name("udaomining"), &symbol).unwrap();
        registry.setup_miner(&alice, &name("alice"), &symbol).unwrap();
        registry
    }

    #[test]
    fn test_plan_below_interval() {
        assert_eq!(plan_tranches(CREATED_AT, CREATED_AT, &udao(0)), Ok(None));
        assert_eq!(plan_tranches(CREATED_AT, CREATED_AT + 599, &udao(0)), Ok(None));
        assert_eq!(plan_tranches(CREATED_AT, CREATED_AT - 10, &udao(0)), Ok(None));
    }

    #[test]
    fn test_plan_three_tranches() {
        let plan = plan_tranches(CREATED_AT, CREATED_AT + 1_800, &udao(0))
            .unwrap()
            .unwrap();
        assert_eq!(plan.tranche_count, 3);
        assert_eq!(plan.unit_reward, udao(5_000_000_000));
        assert_eq!(plan.issued, udao(15_000_000_000));
        assert_eq!(plan.next_reward_at, CREATED_AT + 1_800);
    }

    #[test]
    fn test_plan_keeps_phase_alignment() {
        let plan = plan_tranches(CREATED_AT, CREATED_AT + 1_799, &udao(0))
            .unwrap()
            .unwrap();
        assert_eq!(plan.tranche_count, 2);
        assert_eq!(plan.next_reward_at, CREATED_AT + 1_200);
    }

    #[test]
    fn test_ignores_foreign_notifications() {
        let scheduler = scheduler();
        let mut registry = registry();
        let mut outbox = Outbox::new();

        let mut wrong_ledger = deposit("alice");
        wrong_ledger.token_contract = name("fake.token");
        let mut outgoing = deposit("alice");
        outgoing.from = name("udaomining");
        outgoing.to = name("alice");
        let mut self_sent = deposit("alice");
        self_sent.from = name("udaomining");

        for notification in [wrong_ledger, outgoing, self_sent] {
            let outcome = scheduler
                .on_deposit(&mut registry, &notification, CREATED_AT + 6_000, &mut outbox)
                .unwrap();
            assert_eq!(outcome, None);
        }
        assert!(outbox.is_empty());
        assert_eq!(registry.query_last_reward_time(&code()), Ok(CREATED_AT));
    }

    #[test]
    fn test_requires_initialized_depositor() {
        let scheduler = scheduler();
        let mut registry = registry();
        let mut outbox = Outbox::new();

        let result = scheduler.on_deposit(&mut registry, &deposit("bob"), CREATED_AT + 1_800, &mut outbox);
        assert_eq!(result, Err(LedgerError::NotInitialized("bob".to_string())));
        assert!(outbox.is_empty());
        assert_eq!(registry.query_last_reward_time(&code()), Ok(CREATED_AT));
    }

    #[test]
    fn test_gated_trigger_only_refunds() {
        let scheduler = scheduler();
        let mut registry = registry();
        let mut outbox = Outbox::new();

        let outcome = scheduler
            .on_deposit(&mut registry, &deposit("alice"), CREATED_AT + 599, &mut outbox)
            .unwrap()
            .unwrap();

        assert_eq!(outcome, MiningOutcome::default());
        assert_eq!(outbox.len(), 1);
        assert!(outbox.iter().all(Effect::is_external));
        assert_eq!(registry.query_last_reward_time(&code()), Ok(CREATED_AT));
    }

    #[test]
    fn test_trigger_queues_mint_and_payout() {
        let scheduler = scheduler();
        let mut registry = registry();
        let mut outbox = Outbox::new();

        let outcome = scheduler
            .on_deposit(&mut registry, &deposit("alice"), CREATED_AT + 1_800, &mut outbox)
            .unwrap()
            .unwrap();

        assert_eq!(outcome.tranches, 3);
        assert_eq!(outcome.issued, Some(udao(15_000_000_000)));
        assert_eq!(outcome.payout, Some(udao(375_000)));
        assert_eq!(registry.query_last_reward_time(&code()), Ok(CREATED_AT + 1_800));

        // Nothing is minted until the queued effects run
        assert_eq!(registry.query_supply(&code()).unwrap().current_supply, udao(0));

        let effects: Vec<Effect> = outbox.iter().cloned().collect();
        assert_eq!(effects.len(), 3);
        assert!(effects[0].is_external());
        assert_eq!(
            effects[1],
            Effect::Issue {
                to: name("udaomining"),
                quantity: udao(15_000_000_000),
                memo: "Issue UDAO".to_string(),
            }
        );
        assert_eq!(
            effects[2],
            Effect::Transfer {
                from: name("udaomining"),
                to: name("alice"),
                quantity: udao(375_000),
                memo: "Mine UDAO".to_string(),
            }
        );
    }

    #[test]
    fn test_tranches_follow_current_tier() {
        let scheduler = scheduler();
        let miner = AuthContext::signed_by(name("udaomining"));
        let mut registry = registry();
        let premine = udao(10_500_001 * 100_000_000);
        registry.mint(&miner, &name("udaomining"), &premine, "premine").unwrap();

        let mut outbox = Outbox::new();
        let outcome = scheduler
            .on_deposit(&mut registry, &deposit("alice"), CREATED_AT + 1_800, &mut outbox)
            .unwrap()
            .unwrap();

        assert_eq!(outcome.tranches, 3);
        assert_eq!(outcome.issued, Some(udao(3 * 2_500_000_000)));
        assert_eq!(outcome.payout, Some(udao(26_250_190_000)));
        assert!(outbox.iter().any(|effect| matches!(
            effect,
            Effect::Issue { quantity, .. } if *quantity == udao(7_500_000_000)
        )));
    }

    #[test]
    fn test_over_cap_tranche_fails_without_side_effects() {
        let scheduler = scheduler();
        let miner = AuthContext::signed_by(name("udaomining"));
        let alice = AuthContext::signed_by(name("alice"));
        let symbol: Symbol = "8,UDAO".parse().unwrap();

        let mut registry = TokenRegistry::new(name("udaomining"));
        registry
            .create(&miner, name("udaomining"), udao(10_000_000_000), CREATED_AT)
            .unwrap();
        registry.setup_miner(&miner, &name("udaomining"), &symbol).unwrap();
        registry.setup_miner(&alice, &name("alice"), &symbol).unwrap();

        let mut outbox = Outbox::new();
        let result = scheduler.on_deposit(&mut registry, &deposit("alice"), CREATED_AT + 1_800, &mut outbox);

        assert_eq!(
            result,
            Err(LedgerError::SupplyExceeded {
                requested: 15_000_000_000,
                available: 10_000_000_000
            })
        );
        assert!(outbox.is_empty());
        assert_eq!(registry.query_last_reward_time(&code()), Ok(CREATED_AT));
    }
}
