//! Halving reward tiers
//!
//! The per-tranche reward is picked from a fixed ladder keyed by how many
//! whole tokens have been issued so far. Each bound is inclusive: a supply of
//! exactly 10,500,000 tokens still earns the first tier.

use udao_core::Asset;

use crate::constants::{FULLY_MINED_UNITS, SUPPLY_UNIT_SCALE};

/// `(inclusive upper bound in whole tokens, reward in raw units)`
pub const REWARD_TIERS: [(i64, i64); 24] = [
    (10_500_000, 5_000_000_000),
    (15_750_000, 2_500_000_000),
    (18_375_000, 1_250_000_000),
    (19_687_500, 625_000_000),
    (20_343_750, 312_500_000),
    (20_671_875, 156_250_000),
    (20_835_938, 78_125_000),
    (20_917_969, 39_062_500),
    (20_958_984, 19_531_250),
    (20_979_492, 9_765_625),
    (20_989_746, 4_882_813),
    (20_994_873, 2_441_406),
    (20_997_437, 1_220_703),
    (20_998_718, 610_352),
    (20_999_359, 305_176),
    (20_999_680, 152_588),
    (20_999_840, 76_294),
    (20_999_920, 38_147),
    (20_999_960, 19_073),
    (20_999_980, 9_537),
    (20_999_990, 4_768),
    (20_999_995, 2_384),
    (20_999_998, 1_192),
    (FULLY_MINED_UNITS - 1, 596),
];

/// Whole tokens represented by a raw supply amount
pub fn supply_units(raw_supply: i64) -> i64 {
    raw_supply / SUPPLY_UNIT_SCALE
}

/// Raw reward for a supply expressed in whole tokens; zero once fully mined
pub fn reward_for_units(supply_unit: i64) -> i64 {
    REWARD_TIERS
        .iter()
        .find(|(bound, _)| supply_unit <= *bound)
        .map(|(_, reward)| *reward)
        .unwrap_or(0)
}

/// Reward for one tranche at the given supply, in the supply's symbol
pub fn reward_for_tier(supply: &Asset) -> Asset {
    Asset::new(
        reward_for_units(supply_units(supply.amount)),
        supply.symbol.clone(),
    )
}
