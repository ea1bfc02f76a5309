//! Trait interfaces for the Tidelock ledger.
//!
//! These traits define the contracts between crates and collaborators:
//! - [`Asset`]: the transferable balance being locked (external token; [`MemoryAsset`](crate::asset::MemoryAsset) in tests)
//! - [`YieldCurve`]: elapsed lock time to yield rate (tidelock-curve implements)
//! - [`StakeView`]: read path consumed by the voting collaborator (tidelock-ledger implements)

use crate::error::{AssetError, CurveError, LedgerError};
use crate::types::{AccountId, StakeInfo, TokenAddress};

/// A fungible balance held by accounts.
///
/// Implementations may charge their own transfer fee or burn part of a
/// transfer, so callers that need the amount actually received must observe
/// it through [`balance_of`](Self::balance_of) deltas rather than trust the
/// nominal amount.
pub trait Asset: Send + Sync {
    /// Address identifying this token.
    fn address(&self) -> TokenAddress;

    /// Current balance of `account`.
    fn balance_of(&self, account: &AccountId) -> u64;

    /// Pull `amount` from `from` into `custodian`, spending the allowance
    /// `from` granted to `custodian`.
    fn transfer_in(
        &self,
        from: &AccountId,
        custodian: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError>;

    /// Push `amount` from `custodian` to `to`.
    fn transfer_out(
        &self,
        custodian: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError>;
}

/// Pure mapping from elapsed lock time to an annualized yield rate.
///
/// Rates are in hundredths of a percent per year. Implementations must be
/// stateless: the same `elapsed` always yields the same rate.
pub trait YieldCurve: Send + Sync {
    /// Rate in force after `elapsed_secs` seconds of lock.
    fn rate_at(&self, elapsed_secs: u64) -> u64;

    /// Rate at the start of the lock.
    fn initial_rate(&self) -> u64;

    /// Rate once the lock period has fully elapsed.
    fn final_rate(&self) -> u64;

    /// Length of the decay window in seconds.
    fn lock_period(&self) -> u64;

    /// Rate for a lock that started at `lock_start`, observed at `now`.
    ///
    /// Default implementation clamps negative elapsed time to zero.
    fn rate_between(&self, lock_start: u64, now: u64) -> u64 {
        self.rate_at(now.saturating_sub(lock_start))
    }

    /// Yield earned by `principal` over `duration_secs` at `rate` (floor).
    fn yield_for(&self, principal: u64, rate: u64, duration_secs: u64) -> Result<u64, CurveError>;
}

/// Read-only stake queries for collaborators that gate on locked amounts.
///
/// Snapshots are only as fresh as the position's last checkpoint for the
/// redistributed share; callers that need an exact figure should trigger
/// [`refresh`](Self::refresh) first.
pub trait StakeView {
    /// `(principal, lock_start, current_rate, pending_reward)` for `account`.
    fn staked_amount_and_rate(&self, account: &AccountId) -> Result<StakeInfo, LedgerError>;

    /// Checkpoint `account` so the next snapshot is current.
    fn refresh(&mut self, account: &AccountId) -> Result<(), LedgerError>;

    /// Whether `account` has any principal locked.
    ///
    /// Default implementation: `principal > 0`.
    fn has_stake(&self, account: &AccountId) -> Result<bool, LedgerError> {
        Ok(self.staked_amount_and_rate(account)?.principal > 0)
    }
}
