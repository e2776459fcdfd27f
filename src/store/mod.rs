//! Store module - state owned by the wallet UI and values derived from it

mod reward_calculator;
mod wallet_status;

pub use reward_calculator::*;
pub use wallet_status::*;
