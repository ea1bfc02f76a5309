//! Integration test suite for Tidelock.
//!
//! Tests here drive the ledger end to end against an in-memory asset with a
//! manually advanced clock, checking conservation and fee distribution
//! across many accounts.

pub mod helpers;
