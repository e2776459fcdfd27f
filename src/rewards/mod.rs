//! Rewards module - PoW reward and incentive share per block height

mod curve;

pub use curve::*;
