//! UDAO Mining Module
//!
//! Deposit-triggered issuance with a halving reward schedule:
//! - one tranche per elapsed reward interval
//! - tranche size taken from the supply tier ladder
//! - a slice of the contract balance paid to each depositor

pub mod contract;
pub mod effects;
pub mod rewards;
pub mod scheduler;

pub use contract::{Action, ContractConfig, MiningContract, Receipt};
pub use effects::{Effect, Outbox};
pub use rewards::{reward_for_tier, reward_for_units, supply_units, REWARD_TIERS};
pub use scheduler::{plan_tranches, Deposit, MiningOutcome, RewardScheduler, TranchePlan};

/// Mining constants
pub mod constants {
    /// Seconds per reward tranche (10 minutes)
    pub const REWARD_INTERVAL: u64 = 600;

    /// Depositors receive 1/40000 of the contract balance per trigger
    pub const PAYOUT_DIVISOR: i64 = 40_000;

    /// Raw units per whole token used for tier lookup (8 decimal places)
    pub const SUPPLY_UNIT_SCALE: i64 = 10_000 * 10_000;

    /// Whole-token supply at which the reward drops to zero
    pub const FULLY_MINED_UNITS: i64 = 21_000_000;

    /// Memo on the refund of the triggering deposit
    pub const REFUND_MEMO: &str = "Refund deposit";

    pub const DEFAULT_CONTRACT: &str = "udaomining";
    pub const DEFAULT_DEPOSIT_CONTRACT: &str = "eosio.token";
    pub const DEFAULT_REWARD_SYMBOL: &str = "8,UDAO";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mining_constants() {
        assert_eq!(constants::REWARD_INTERVAL, 600);
        assert_eq!(constants::PAYOUT_DIVISOR, 40_000);
        assert_eq!(constants::SUPPLY_UNIT_SCALE, 100_000_000);
        assert_eq!(REWARD_TIERS.len(), 24);
    }
}
