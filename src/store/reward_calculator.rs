//! Reward calculator store
//!
//! Holds the block height the user is looking at, keeps its on-chain
//! timestamp in sync with the daemon, and derives reward projections from
//! the reward curve.
//!
//! Everything derived is recomputed from the two state fields on each
//! read; nothing is cached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::{
    AVERAGE_BLOCK_TIME_SECS, CHART_SPAN, CHART_STEP, DECIMAL_PLACES, MAX_HEIGHT_DIGITS,
};
use crate::rewards::{RewardCurve, VcashCurve};
use crate::rpc::{BlockHash, BlockInfo, RpcClient, RpcRequest};
use crate::store::ChainTip;

/// Round to the number of decimals rewards are shown with
pub fn round_reward(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMAL_PLACES as i32);
    (value * scale).round() / scale
}

/// True if `input` is an acceptable target height (0-7 ASCII digits)
pub fn is_valid_height(input: &str) -> bool {
    input.len() <= MAX_HEIGHT_DIGITS && input.bytes().all(|b| b.is_ascii_digit())
}

/// One sample of the reward chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardChartPoint {
    pub height: u64,
    pub incentive_reward: f64,
    pub mining_reward: f64,
    pub pow_reward: f64,
}

impl RewardChartPoint {
    /// Sample `curve` at `height`
    pub fn sample<C: RewardCurve + ?Sized>(curve: &C, height: u64) -> Self {
        let pow_reward = curve.calculate_pow(height);
        let incentive_reward = (pow_reward / 100.0) * curve.calculate_incentive(height);
        let mining_reward = pow_reward - incentive_reward;

        Self {
            height,
            incentive_reward: round_reward(incentive_reward),
            mining_reward: round_reward(mining_reward),
            pow_reward: round_reward(pow_reward),
        }
    }
}

/// Snapshot of every derived value for the current target height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardProjection {
    pub height: u64,
    pub pow_reward: f64,
    pub incentive_percent: f64,
    pub incentive_reward: f64,
    pub mining_reward: f64,
    /// Milliseconds since the Unix epoch
    pub time: i64,
    pub estimated: bool,
}

/// Outcome of one block time lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Block exists; timestamp (ms) stored
    Resolved(i64),
    /// Daemon has no block at this height yet
    NotFound,
    /// Transport failure or malformed answer; state untouched
    Unavailable,
    /// Target height changed while the lookup was in flight; answer dropped
    Stale,
}

/// Block reward projection store
#[derive(Debug)]
pub struct RewardCalculator<C = VcashCurve> {
    curve: C,
    /// Target height as typed, `""` when unset
    height: watch::Sender<String>,
    /// On-chain block time in ms, 0 while unresolved
    resolved_timestamp: watch::Sender<i64>,
}

impl Default for RewardCalculator<VcashCurve> {
    fn default() -> Self {
        Self::new(VcashCurve)
    }
}

impl<C: RewardCurve> RewardCalculator<C> {
    pub fn new(curve: C) -> Self {
        let (height, _) = watch::channel(String::new());
        let (resolved_timestamp, _) = watch::channel(0);

        Self {
            curve,
            height,
            resolved_timestamp,
        }
    }

    pub fn height(&self) -> String {
        self.height.borrow().clone()
    }

    pub fn resolved_timestamp(&self) -> i64 {
        *self.resolved_timestamp.borrow()
    }

    pub fn subscribe_resolved_timestamp(&self) -> watch::Receiver<i64> {
        self.resolved_timestamp.subscribe()
    }

    /// Set the target height
    ///
    /// Input that is not 0-7 digits is ignored and the previous height
    /// kept. Returns whether `input` was accepted.
    pub fn set_height(&self, input: &str) -> bool {
        if !is_valid_height(input) {
            debug!(input, "ignoring invalid block height");
            return false;
        }

        self.height.send_if_modified(|height| {
            if *height == input {
                return false;
            }
            *height = input.to_string();
            true
        });

        true
    }

    pub fn set_resolved_timestamp(&self, ms: i64) {
        self.resolved_timestamp.send_if_modified(|current| {
            if *current == ms {
                return false;
            }
            *current = ms;
            true
        });
    }

    pub fn clear_resolved_timestamp(&self) {
        self.set_resolved_timestamp(0);
    }

    /// Target height as a number, 0 when unset
    pub fn height_as_number(&self) -> u64 {
        // At most 7 digits, so any non-empty value parses
        self.height.borrow().parse().unwrap_or(0)
    }

    pub fn current_pow_reward(&self) -> f64 {
        self.curve.calculate_pow(self.height_as_number())
    }

    pub fn current_incentive_percent(&self) -> f64 {
        self.curve.calculate_incentive(self.height_as_number())
    }

    pub fn current_incentive_reward(&self) -> f64 {
        (self.current_pow_reward() / 100.0) * self.current_incentive_percent()
    }

    pub fn current_mining_reward(&self) -> f64 {
        self.current_pow_reward() - self.current_incentive_reward()
    }

    /// True while the block time is an estimate rather than on-chain data
    pub fn is_estimated(&self) -> bool {
        self.resolved_timestamp() == 0
    }

    /// Block time in ms: the on-chain time if known, otherwise an estimate
    /// from `now_ms` assuming `AVERAGE_BLOCK_TIME_SECS` per block
    pub fn projected_time_at<T: ChainTip + ?Sized>(&self, now_ms: i64, chain: &T) -> i64 {
        let resolved = self.resolved_timestamp();
        if resolved != 0 {
            return resolved;
        }

        let blocks_ahead = self.height_as_number() as i64 - chain.current_chain_height() as i64;
        now_ms + 1000 * AVERAGE_BLOCK_TIME_SECS * blocks_ahead
    }

    /// `projected_time_at` against the wall clock
    pub fn projected_time<T: ChainTip + ?Sized>(&self, chain: &T) -> i64 {
        self.projected_time_at(chrono::Utc::now().timestamp_millis(), chain)
    }

    /// Rewards for the target height and every `CHART_STEP` blocks after
    /// it, `CHART_SPAN` blocks in total (41 points)
    pub fn chart_series(&self) -> Vec<RewardChartPoint> {
        let start = self.height_as_number();

        (0..=CHART_SPAN / CHART_STEP)
            .map(|k| RewardChartPoint::sample(&self.curve, start + k * CHART_STEP))
            .collect()
    }

    pub fn projection_at<T: ChainTip + ?Sized>(&self, now_ms: i64, chain: &T) -> RewardProjection {
        RewardProjection {
            height: self.height_as_number(),
            pow_reward: self.current_pow_reward(),
            incentive_percent: self.current_incentive_percent(),
            incentive_reward: self.current_incentive_reward(),
            mining_reward: self.current_mining_reward(),
            time: self.projected_time_at(now_ms, chain),
            estimated: self.is_estimated(),
        }
    }

    pub fn projection<T: ChainTip + ?Sized>(&self, chain: &T) -> RewardProjection {
        self.projection_at(chrono::Utc::now().timestamp_millis(), chain)
    }

    fn is_current(&self, height: u64) -> bool {
        self.height_as_number() == height
    }

    /// The daemon has no block at `height`
    fn mark_not_found(&self, height: u64) -> Resolution {
        debug!(height, "block not on chain yet");
        if self.resolved_timestamp() != 0 {
            self.clear_resolved_timestamp();
        }
        Resolution::NotFound
    }

    /// Look up the block time of the current target height
    ///
    /// `getblockhash`, then `getblock`. Answers arriving after the target
    /// height changed are dropped.
    pub async fn resolve<R: RpcClient + ?Sized>(&self, rpc: &R) -> Resolution {
        let height = self.height_as_number();

        // Step 1: hash of the block at the target height
        let response = match rpc.call_one(RpcRequest::get_block_hash(height)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(height, error = %e, "getblockhash failed");
                return Resolution::Unavailable;
            }
        };
        // The user may have moved on while we waited
        if !self.is_current(height) {
            return Resolution::Stale;
        }

        // No result means the chain has not reached the height
        let hash = match response.decode::<String>() {
            Ok(Some(hex)) => match BlockHash::from_hex(&hex) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(height, hash = %hex, error = %e, "daemon returned an invalid block hash");
                    return Resolution::Unavailable;
                }
            },
            Ok(None) => return self.mark_not_found(height),
            Err(e) => {
                warn!(height, error = %e, "unexpected getblockhash result");
                return Resolution::Unavailable;
            }
        };

        // Step 2: the block itself, for its timestamp
        let response = match rpc.call_one(RpcRequest::get_block(&hash)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(height, %hash, error = %e, "getblock failed");
                return Resolution::Unavailable;
            }
        };
        if !self.is_current(height) {
            return Resolution::Stale;
        }

        match response.decode::<BlockInfo>() {
            // 0 is the "unresolved" marker, so a block can never carry it
            Ok(Some(block)) if block.time <= 0 => {
                warn!(height, %hash, time = block.time, "getblock returned no usable time");
                Resolution::Unavailable
            }
            Ok(Some(block)) => {
                // Daemon reports seconds
                let ms = block.time.saturating_mul(1000);
                self.set_resolved_timestamp(ms);
                debug!(height, %hash, time = ms, "block time resolved");
                Resolution::Resolved(ms)
            }
            Ok(None) => self.mark_not_found(height),
            Err(e) => {
                warn!(height, %hash, error = %e, "unexpected getblock result");
                Resolution::Unavailable
            }
        }
    }
}

impl<C: RewardCurve + 'static> RewardCalculator<C> {
    /// Keep the block time in sync with the target height
    ///
    /// Resolves once immediately, then again each time the numeric height
    /// changes. Heights set while a lookup is in flight collapse into the
    /// latest one. Runs until the handle is aborted.
    pub fn spawn_resolver<R>(self: &Arc<Self>, rpc: Arc<R>) -> JoinHandle<()>
    where
        R: RpcClient + ?Sized + 'static,
    {
        let store = Arc::clone(self);
        let mut heights = self.height.subscribe();

        tokio::spawn(async move {
            let mut last_height = None;

            loop {
                let height = store.height_as_number();
                // "7" and "007" are the same block
                if last_height != Some(height) {
                    last_height = Some(height);
                    let outcome = store.resolve(rpc.as_ref()).await;
                    debug!(height, ?outcome, "block time lookup finished");
                }

                if heights.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
