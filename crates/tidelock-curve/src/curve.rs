//! Linear decaying rate curve implementing the [`YieldCurve`] trait.
//!
//! The rate ramps linearly from `initial` at lock start down to `final` at the
//! end of the lock period and stays flat afterwards:
//!
//! ```text
//! rate(e) = final + (initial - final) * (lock - min(e, lock)) / lock
//! ```
//!
//! This is the same line as `initial - (initial - final) * min(e, lock) / lock`,
//! but the integer division applies to the part *above* `final`, so any
//! rounding lowers the rate and yield is never over-credited.

use tidelock_core::config::LedgerConfig;
use tidelock_core::constants::{MAX_RATE_BPS, YIELD_DENOMINATOR};
use tidelock_core::error::CurveError;
use tidelock_core::traits::YieldCurve;

use crate::fixed::{mul3_div_floor, to_u64};

/// Stateless linear decay from `initial` to `final` over the lock period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearDecayCurve {
    initial: u64,
    final_rate: u64,
    lock_period: u64,
}

impl LinearDecayCurve {
    /// Create a curve. Rates are hundredths of a percent per year.
    pub fn new(initial: u64, final_rate: u64, lock_period: u64) -> Result<Self, CurveError> {
        if lock_period == 0 {
            return Err(CurveError::ZeroLockPeriod);
        }
        if initial > MAX_RATE_BPS {
            return Err(CurveError::RateTooHigh(initial));
        }
        if final_rate > initial {
            return Err(CurveError::RatesInverted {
                initial_bps: initial,
                final_bps: final_rate,
            });
        }
        Ok(Self {
            initial,
            final_rate,
            lock_period,
        })
    }

    /// Build the curve a deployment configuration describes.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, CurveError> {
        Self::new(
            config.initial_rate_bps,
            config.final_rate_bps,
            config.lock_period_secs,
        )
    }

    /// Whether the curve is flat (no decay).
    pub fn is_flat(&self) -> bool {
        self.initial == self.final_rate
    }
}

impl YieldCurve for LinearDecayCurve {
    fn rate_at(&self, elapsed_secs: u64) -> u64 {
        let remaining = self.lock_period - elapsed_secs.min(self.lock_period);
        let span = (self.initial - self.final_rate) as u128;
        // span <= MAX_RATE_BPS and remaining <= lock_period, so the product
        // fits u128 and the quotient is at most `span`.
        let above_final = span * remaining as u128 / self.lock_period as u128;
        self.final_rate + above_final as u64
    }

    fn initial_rate(&self) -> u64 {
        self.initial
    }

    fn final_rate(&self) -> u64 {
        self.final_rate
    }

    fn lock_period(&self) -> u64 {
        self.lock_period
    }

    fn yield_for(&self, principal: u64, rate: u64, duration_secs: u64) -> Result<u64, CurveError> {
        if principal == 0 || rate == 0 || duration_secs == 0 {
            return Ok(0);
        }
        // floor(floor(p * r * t / YEAR) / DENOM) == floor(p * r * t / (YEAR * DENOM))
        let value = mul3_div_floor(
            principal as u128,
            rate as u128,
            duration_secs as u128,
            YIELD_DENOMINATOR,
        )
        .ok_or(CurveError::ArithmeticOverflow)?;
        to_u64(value).ok_or(CurveError::ArithmeticOverflow)
    }
}
