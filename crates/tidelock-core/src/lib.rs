//! # tidelock-core
//! Foundation types, traits, and configuration for the Tidelock staking ledger.

pub mod asset;
pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
