//! XVC Wallet Core Library
//!
//! Block reward projection for the XVC desktop wallet, backed by the
//! local wallet daemon's JSON-RPC interface.
//!
//! The daemon owns the chain; this crate only asks it questions.

pub mod config;
pub mod geoip;
pub mod rewards;
pub mod rpc;
pub mod store;

/// Protocol and projection constants - HARD-CODED, NOT CONFIGURABLE
pub mod constants {
    /// Base units per coin (6 decimal places)
    pub const COIN: u64 = 1_000_000;

    /// Number of decimal places shown for rewards
    pub const DECIMAL_PLACES: u32 = 6;

    /// Average block interval in seconds, used for time estimates
    pub const AVERAGE_BLOCK_TIME_SECS: i64 = 140;

    /// Distance between two chart samples (blocks)
    pub const CHART_STEP: u64 = 2_500;

    /// Blocks covered by the chart after the target height
    pub const CHART_SPAN: u64 = 100_000;

    /// Maximum number of digits accepted for a target height
    pub const MAX_HEIGHT_DIGITS: usize = 7;

    /// Ticker symbol
    pub const CURRENCY_CODE: &str = "XVC";

    /// Wallet daemon RPC endpoint
    pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9195";

    /// IP geolocation service (the IP is appended)
    pub const DEFAULT_GEOIP_URL: &str = "https://geoip.nekudo.com/api/";
}
