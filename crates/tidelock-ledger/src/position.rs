//! Per-account lock record.

use serde::{Deserialize, Serialize};

/// One account's lock.
///
/// Field order is part of the persisted layout: snapshots written by one
/// build must decode in the next, so fields are only ever appended.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Position {
    /// Amount currently locked.
    pub principal: u64,
    /// Start of the current lock; reset only when principal goes from zero.
    pub lock_start: u64,
    /// Timestamp of the last accrual.
    pub last_checkpoint: u64,
    /// Global redistribution index observed at `last_checkpoint`.
    pub last_global_index: u128,
    /// Yield accrued and not yet paid out, before the fee.
    pub accrued_reward: u64,
}

impl Position {
    /// Whether nothing is locked.
    pub fn is_empty(&self) -> bool {
        self.principal == 0
    }

    /// First timestamp at which the lock has run its full period.
    pub fn unlocks_at(&self, lock_period: u64) -> u64 {
        self.lock_start.saturating_add(lock_period)
    }

    /// Whether the lock period has fully elapsed at `now`.
    pub fn is_matured(&self, now: u64, lock_period: u64) -> bool {
        now >= self.unlocks_at(lock_period)
    }
}
