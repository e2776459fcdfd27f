//! Property-based tests for the XVC reward projection core
//!
//! These tests verify invariants hold under random inputs.

use proptest::prelude::*;
use xvc_core::constants::{AVERAGE_BLOCK_TIME_SECS, CHART_STEP, COIN};
use xvc_core::rewards::{
    calculate_incentive_percent, calculate_pow_units, RewardCurve, VcashCurve,
    MAX_INCENTIVE_PERCENT,
};
use xvc_core::store::{is_valid_height, round_reward, RewardCalculator};

// ============================================================================
// HEIGHT INPUT
// ============================================================================

proptest! {
    /// Anything but 0-7 ASCII digits is ignored
    #[test]
    fn prop_invalid_input_keeps_height(previous in "[0-9]{0,7}", input in "\\PC{0,12}") {
        prop_assume!(!is_valid_height(&input));

        let store = RewardCalculator::new(VcashCurve);
        store.set_height(&previous);

        prop_assert!(!store.set_height(&input));
        prop_assert_eq!(store.height(), previous);
    }

    /// Numeric-looking but out of pattern: negatives, decimals, 8+ digits
    #[test]
    fn prop_numeric_lookalikes_rejected(
        input in prop_oneof!["-[0-9]{1,6}", "[0-9]{1,3}\\.[0-9]{1,3}", "[0-9]{8,12}"]
    ) {
        let store = RewardCalculator::new(VcashCurve);
        prop_assert!(!store.set_height(&input));
        prop_assert_eq!(store.height(), "");
    }

    /// Accepted input is what `height_as_number` reads back
    #[test]
    fn prop_valid_input_parses(input in "[0-9]{0,7}") {
        let store = RewardCalculator::new(VcashCurve);
        prop_assert!(store.set_height(&input));

        let expected: u64 = if input.is_empty() { 0 } else { input.parse().unwrap() };
        prop_assert_eq!(store.height_as_number(), expected);
    }
}

// ============================================================================
// CHART SERIES
// ============================================================================

proptest! {
    /// 41 points, 2,500 blocks apart, starting at the target height
    #[test]
    fn prop_chart_shape(height in 0u64..=9_999_999u64) {
        let store = RewardCalculator::new(VcashCurve);
        store.set_height(&height.to_string());

        let series = store.chart_series();
        prop_assert_eq!(series.len(), 41);
        prop_assert_eq!(series[0].height, height);
        for pair in series.windows(2) {
            prop_assert_eq!(pair[1].height, pair[0].height + CHART_STEP);
        }
    }

    /// Mining plus incentive share is the PoW reward, up to rounding
    #[test]
    fn prop_chart_rewards_add_up(height in 0u64..=9_999_999u64) {
        let store = RewardCalculator::new(VcashCurve);
        store.set_height(&height.to_string());

        for point in store.chart_series() {
            let total = point.mining_reward + point.incentive_reward;
            prop_assert!((total - point.pow_reward).abs() <= 1e-6 + 1e-9);
            prop_assert_eq!(round_reward(point.pow_reward), point.pow_reward);
        }
    }

    /// Estimate is linear in the distance to the chain tip
    #[test]
    fn prop_estimated_time(
        height in 0u64..=9_999_999u64,
        tip in 0u64..=9_999_999u64,
        now in 0i64..4_000_000_000_000i64
    ) {
        let store = RewardCalculator::new(VcashCurve);
        store.set_height(&height.to_string());

        prop_assert!(store.is_estimated());
        let expected = now + 1000 * AVERAGE_BLOCK_TIME_SECS * (height as i64 - tip as i64);
        prop_assert_eq!(store.projected_time_at(now, &tip), expected);
    }
}

// ============================================================================
// REWARD CURVE
// ============================================================================

proptest! {
    /// PoW reward stays between 1 and 128 coins
    #[test]
    fn prop_pow_bounded(height in any::<u64>()) {
        let reward = calculate_pow_units(height);
        prop_assert!(reward >= COIN);
        prop_assert!(reward <= 128 * COIN);
    }

    /// PoW reward never grows with height
    #[test]
    fn prop_pow_non_increasing(a in 0u64..20_000_000u64, b in 0u64..20_000_000u64) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(calculate_pow_units(high) <= calculate_pow_units(low));
    }

    /// Incentive share never shrinks and never exceeds its ceiling
    #[test]
    fn prop_incentive_monotonic(a in 0u64..20_000_000u64, b in 0u64..20_000_000u64) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(calculate_incentive_percent(low) <= calculate_incentive_percent(high));
        prop_assert!(calculate_incentive_percent(high) <= MAX_INCENTIVE_PERCENT);
    }

    /// The f64 view agrees with the integer schedule
    #[test]
    fn prop_curve_matches_units(height in 0u64..20_000_000u64) {
        let curve = VcashCurve;
        prop_assert_eq!(curve.calculate_pow(height), calculate_pow_units(height) as f64 / COIN as f64);
        prop_assert_eq!(curve.calculate_incentive(height), calculate_incentive_percent(height) as f64);
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Flat curve: 100 coins at 10% incentive
struct FlatCurve;

impl RewardCurve for FlatCurve {
    fn calculate_pow(&self, _height: u64) -> f64 {
        100.0
    }

    fn calculate_incentive(&self, _height: u64) -> f64 {
        10.0
    }
}

#[test]
fn test_scenario_height_1000() {
    let store = RewardCalculator::new(FlatCurve);
    store.set_height("1000");

    assert_eq!(store.current_incentive_reward(), 10.0);
    let first = store.chart_series()[0];
    assert_eq!(first.height, 1000);
    assert_eq!(first.pow_reward, 100.0);
    assert_eq!(first.incentive_reward, 10.0);
    assert_eq!(first.mining_reward, 90.0);
}

#[test]
fn test_scenario_garbage_on_fresh_store() {
    let store = RewardCalculator::new(FlatCurve);
    store.set_height("abc");

    assert_eq!(store.height(), "");
    assert_eq!(store.height_as_number(), 0);
}
