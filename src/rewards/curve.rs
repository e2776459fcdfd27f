//! Block reward curves
//!
//! Two deterministic functions of block height: the proof-of-work reward
//! and the percentage of it redirected to the incentive pool.

use crate::constants::COIN;

/// Reward curve consulted by the projection store.
///
/// Implementations must be pure and total over all heights.
pub trait RewardCurve: Send + Sync {
    /// Proof-of-work reward at `height`, in coins
    fn calculate_pow(&self, height: u64) -> f64;

    /// Share of the PoW reward paid to the incentive pool, in percent
    fn calculate_incentive(&self, height: u64) -> f64;
}

/// Reward at genesis (in base units)
const INITIAL_POW_REWARD: u64 = 128 * COIN;

/// The reward never decays below one coin
const MIN_POW_REWARD: u64 = COIN;

/// Height from which part of the reward goes to the incentive pool
pub const INCENTIVE_START_HEIGHT: u64 = 220_000;

/// Blocks between two one-percent incentive increases
pub const INCENTIVE_STEP: u64 = 7_000;

/// Incentive share ceiling
pub const MAX_INCENTIVE_PERCENT: u64 = 40;

/// Geometric decay applied `height / interval` times while `height < below`
struct DecayBand {
    below: u64,
    interval: u64,
    divisor: u64,
}

const DECAY_BANDS: [DecayBand; 3] = [
    DecayBand { below: 325_000, interval: 50_000, divisor: 6 },
    DecayBand { below: 385_000, interval: 10_000, divisor: 28 },
    DecayBand { below: u64::MAX, interval: 7_000, divisor: 28 },
];

/// Calculate the PoW reward for a given height
///
/// This is a pure, deterministic function.
///
/// # Returns
/// Reward in base units (1 coin = `COIN` units)
pub fn calculate_pow_units(height: u64) -> u64 {
    // The band is picked by height, then applied from genesis
    let band = DECAY_BANDS
        .iter()
        .find(|band| height < band.below)
        .unwrap_or(&DECAY_BANDS[DECAY_BANDS.len() - 1]);

    let mut reward = INITIAL_POW_REWARD;
    for _ in 0..height / band.interval {
        // Integer division truncates, same result on every platform
        reward -= reward / band.divisor;

        // Floor reached, further steps change nothing
        if reward <= MIN_POW_REWARD {
            return MIN_POW_REWARD;
        }
    }

    reward
}

/// Calculate the incentive percentage for a given height
pub fn calculate_incentive_percent(height: u64) -> u64 {
    if height < INCENTIVE_START_HEIGHT {
        return 0;
    }

    // 1% at the start height, +1% per step
    (1 + (height - INCENTIVE_START_HEIGHT) / INCENTIVE_STEP).min(MAX_INCENTIVE_PERCENT)
}

/// Verify that both curves stay inside their bounds
///
/// Samples every `step` blocks up to `up_to_height`.
/// Used for testing and verification only.
pub fn verify_curve_bounds(up_to_height: u64, step: u64) -> bool {
    let step = step.max(1);
    let mut height = 0;

    while height <= up_to_height {
        // Reward within [floor, genesis reward]
        let reward = calculate_pow_units(height);
        if !(MIN_POW_REWARD..=INITIAL_POW_REWARD).contains(&reward) {
            return false;
        }
        if calculate_incentive_percent(height) > MAX_INCENTIVE_PERCENT {
            return false;
        }
        height += step;
    }

    true
}

/// The XVC main network reward schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VcashCurve;

impl RewardCurve for VcashCurve {
    fn calculate_pow(&self, height: u64) -> f64 {
        calculate_pow_units(height) as f64 / COIN as f64
    }

    fn calculate_incentive(&self, height: u64) -> f64 {
        calculate_incentive_percent(height) as f64
    }
}
