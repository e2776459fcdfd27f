//! JSON-RPC Client Module
//!
//! Talks to the local wallet daemon over HTTP.

mod client;
mod methods;

pub use client::*;
pub use methods::*;
