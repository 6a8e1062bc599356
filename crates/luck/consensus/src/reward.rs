//! Block reward schedule and finalization credits.

use alloy_primitives::U256;

use luck_primitives::{params, Header, State};

/// Base block reward before any halving, in wei.
pub const BLOCK_REWARD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Blocks per reward period: two years of 20 s blocks.
pub const HALVING_PERIOD: u64 = 3_110_400;

/// Periods after which the reward drops to zero outright.
const HALVING_CUTOFF: u64 = 50;

/// Author fund share of the block reward, in percent.
const AUTHOR_REWARD_PERCENT: u64 = 5;

/// The miner reward at `height`: the base reward decayed by 9/10 per
/// elapsed period, truncating at every step, and cut to zero past the
/// final period.
pub fn block_reward(height: u64) -> U256 {
    let periods = height / HALVING_PERIOD;
    if periods > HALVING_CUTOFF {
        return U256::ZERO;
    }
    let mut reward = BLOCK_REWARD;
    for _ in 0..periods {
        reward = reward * U256::from(9u64) / U256::from(10u64);
    }
    reward
}

/// Credit the block reward to the coinbase and the author-fund share to the
/// protocol address.
///
/// Uncle coinbases receive nothing in this revision of the schedule.
pub(crate) fn accumulate_rewards(state: &mut dyn State, header: &Header, _uncles: &[Header]) {
    let reward = block_reward(header.number);
    let author_reward = reward * U256::from(AUTHOR_REWARD_PERCENT) / U256::from(100u64);

    state.add_balance(header.coinbase, reward);
    state.add_balance(params::AUTHOR_REWARD_ADDR, author_reward);
}
