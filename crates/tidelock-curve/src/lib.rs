//! # tidelock-curve: Decaying yield-rate curve.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Linear decay**: the annualized rate falls from the initial rate at
//!   lock start to the final rate at the end of the lock period, then holds.
//! - **Round-down**: the integer division applies to the span above the final
//!   rate, so rounding never credits more yield than the exact line.
//! - **Checked yield**: `principal * rate * seconds / (YEAR * 10_000)` on
//!   `u128` intermediates; overflow is an error, never a wrap or a clamp.

pub mod curve;
pub mod fixed;

pub use curve::LinearDecayCurve;
