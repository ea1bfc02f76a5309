//! Lazy accrual and index redistribution math.
//!
//! Nothing here touches ledger state: every function takes values and
//! returns new values, so the ledger can stage a whole operation before
//! committing any of it.
//!
//! # Sampling error
//!
//! A checkpoint prices its whole interval `[last_checkpoint, now]` at a
//! single rate instead of integrating the curve. For a linear ramp with slope
//! `s = (initial - final) / lock` the error per checkpoint is bounded by
//! `principal * s * dt^2 / (YEAR * 10_000)`, and vanishes once both ends of
//! the interval are past the lock period.
//!
//! - [`AccrualPolicy::CheckpointSample`] uses the rate at `now`, so it
//!   under-credits by at most that bound.
//! - [`AccrualPolicy::TwoSegment`] uses the rate at `last_checkpoint` for
//!   the part of the interval inside the lock and the final rate for the part
//!   after it. The in-lock part over-credits by at most the same bound; the
//!   post-lock part is exact.

use tidelock_core::config::AccrualPolicy;
use tidelock_core::constants::{BPS_PRECISION, INDEX_PRECISION};
use tidelock_core::error::LedgerError;
use tidelock_core::traits::YieldCurve;
use tidelock_curve::fixed::{mul_div_floor, to_u64};

use crate::position::Position;

/// Yield owed to `position` from its own principal between its last
/// checkpoint and `now`.
pub fn base_yield(
    curve: &dyn YieldCurve,
    policy: AccrualPolicy,
    position: &Position,
    now: u64,
) -> Result<u64, LedgerError> {
    let dt = now.saturating_sub(position.last_checkpoint);
    if position.principal == 0 || dt == 0 {
        return Ok(0);
    }

    match policy {
        AccrualPolicy::CheckpointSample => {
            let rate = curve.rate_between(position.lock_start, now);
            Ok(curve.yield_for(position.principal, rate, dt)?)
        }
        AccrualPolicy::TwoSegment => {
            let lock_end = position.unlocks_at(curve.lock_period());
            if position.last_checkpoint >= lock_end {
                return Ok(curve.yield_for(position.principal, curve.final_rate(), dt)?);
            }
            let rate = curve.rate_between(position.lock_start, position.last_checkpoint);
            if now <= lock_end {
                return Ok(curve.yield_for(position.principal, rate, dt)?);
            }
            let locked = curve.yield_for(position.principal, rate, lock_end - position.last_checkpoint)?;
            let matured = curve.yield_for(position.principal, curve.final_rate(), now - lock_end)?;
            locked.checked_add(matured).ok_or(LedgerError::ArithmeticOverflow)
        }
    }
}

/// Share of redistributed fees owed to `principal` for an index movement.
pub fn redistributed_yield(principal: u64, index_delta: u128) -> Result<u64, LedgerError> {
    if principal == 0 || index_delta == 0 {
        return Ok(0);
    }
    let share = mul_div_floor(principal as u128, index_delta, INDEX_PRECISION)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    to_u64(share).ok_or(LedgerError::ArithmeticOverflow)
}

/// Checkpoint `position` at `now` against `global_index`.
///
/// Returns the updated position; the input is left untouched.
pub fn accrue(
    position: &Position,
    curve: &dyn YieldCurve,
    policy: AccrualPolicy,
    global_index: u128,
    now: u64,
) -> Result<Position, LedgerError> {
    let base = base_yield(curve, policy, position, now)?;
    let index_delta = global_index
        .checked_sub(position.last_global_index)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let redistributed = redistributed_yield(position.principal, index_delta)?;

    let accrued_reward = position
        .accrued_reward
        .checked_add(base)
        .and_then(|r| r.checked_add(redistributed))
        .ok_or(LedgerError::ArithmeticOverflow)?;

    Ok(Position {
        accrued_reward,
        last_checkpoint: now.max(position.last_checkpoint),
        last_global_index: global_index,
        ..*position
    })
}

/// Index increase that spreads `fee` over `remaining_principal`.
///
/// `remaining_principal` must be non-zero; the caller routes a fee with no
/// remaining principal to the fee pool instead.
pub fn index_increment(fee: u64, remaining_principal: u64) -> Result<u128, LedgerError> {
    mul_div_floor(fee as u128, INDEX_PRECISION, remaining_principal as u128)
        .ok_or(LedgerError::ArithmeticOverflow)
}

/// Split realized yield into `(fee, net)` at `fee_bps`.
pub fn split_fee(gross: u64, fee_bps: u64) -> Result<(u64, u64), LedgerError> {
    let fee = mul_div_floor(gross as u128, fee_bps as u128, BPS_PRECISION as u128)
        .and_then(to_u64)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let net = gross.checked_sub(fee).ok_or(LedgerError::ArithmeticOverflow)?;
    Ok((fee, net))
}
