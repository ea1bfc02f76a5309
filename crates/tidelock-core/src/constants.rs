//! Ledger constants. All monetary values in base units (1 token = 10^8 base units).

pub const COIN: u64 = 100_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Length of the year used to annualize yield rates.
///
/// Fixed at 365 days; leap years are not special-cased so that accrual is
/// reproducible from timestamps alone.
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Denominator for basis-point values (rates and fees). 10_000 bps = 100%.
pub const BPS_PRECISION: u64 = 10_000;

/// Yield rates are expressed in hundredths of a percent per year.
///
/// `45` means 0.45% annualized, i.e. `45 / RATE_DENOMINATOR`.
pub const RATE_DENOMINATOR: u64 = BPS_PRECISION;

/// Divisor turning `principal * rate * seconds` into base units of yield.
pub const YIELD_DENOMINATOR: u128 = SECONDS_PER_YEAR as u128 * RATE_DENOMINATOR as u128;

/// Fixed-point scale of the global redistribution index.
///
/// The index stores "fee per unit of locked principal" multiplied by this
/// value. 10^18 leaves room for `fee * INDEX_PRECISION` with any `u64` fee
/// inside a `u128`.
pub const INDEX_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Upper bound on a configured yield rate (100% per year).
pub const MAX_RATE_BPS: u64 = BPS_PRECISION;

/// Upper bound on the configured fee on realized yield (100%).
pub const MAX_FEE_BPS: u64 = BPS_PRECISION;

/// Prefix for environment variables that override file configuration.
pub const CONFIG_ENV_PREFIX: &str = "TIDELOCK";
