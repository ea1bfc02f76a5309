//! Deployment configuration for a Tidelock ledger.
//!
//! Every deployment runs the same accounting with a different
//! [`LedgerConfig`]: lock period, start/end yield rate, stake cap, and the fee
//! taken from realized yield. The configuration is fixed when the ledger is
//! constructed and threaded through by value afterwards.
//!
//! Files are TOML, layered with `TIDELOCK_`-prefixed environment overrides:
//!
//! ```toml
//! lock_period_secs = 15552000
//! initial_rate_bps = 45
//! final_rate_bps = 25
//! yield_fee_bps = 100
//! accrual_policy = "two_segment"
//!
//! [stake_cap]
//! per_account = 100000000000000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{COIN, CONFIG_ENV_PREFIX, MAX_FEE_BPS, MAX_RATE_BPS, SECONDS_PER_DAY};
use crate::error::{ConfigError, CurveError};

/// Ceiling on how much principal may be locked.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StakeCap {
    /// Maximum principal any single position may hold.
    PerAccount(u64),
    /// Maximum principal across all positions.
    Total(u64),
}

impl StakeCap {
    pub fn limit(&self) -> u64 {
        match self {
            Self::PerAccount(cap) | Self::Total(cap) => *cap,
        }
    }
}

/// How an accrual interval is priced against the rate curve.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccrualPolicy {
    /// One sample of the rate at the checkpoint covers the whole interval.
    CheckpointSample,
    /// Like `CheckpointSample`, but an interval that crosses the end of the
    /// lock period is split: the in-lock part is priced at the rate in force
    /// at the previous checkpoint, the rest at the final rate.
    #[default]
    TwoSegment,
}

/// Immutable per-deployment parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Seconds a stake stays locked; also the length of the rate decay.
    pub lock_period_secs: u64,
    /// Yield rate at lock start, hundredths of a percent per year.
    pub initial_rate_bps: u64,
    /// Yield rate from the end of the lock period onwards.
    pub final_rate_bps: u64,
    pub stake_cap: StakeCap,
    /// Share of realized yield withheld as a fee, in basis points.
    pub yield_fee_bps: u64,
    #[serde(default)]
    pub accrual_policy: AccrualPolicy,
}

impl LedgerConfig {
    /// 30-day lock at a flat 0.20%, 500,000 token cap per account, no fee.
    pub fn monthly() -> Self {
        Self {
            lock_period_secs: 30 * SECONDS_PER_DAY,
            initial_rate_bps: 20,
            final_rate_bps: 20,
            stake_cap: StakeCap::PerAccount(500_000 * COIN),
            yield_fee_bps: 0,
            accrual_policy: AccrualPolicy::TwoSegment,
        }
    }

    /// 180-day lock decaying 0.45% → 0.25%, 1,000,000 token cap per account, 1% fee.
    pub fn semi_annual() -> Self {
        Self {
            lock_period_secs: 180 * SECONDS_PER_DAY,
            initial_rate_bps: 45,
            final_rate_bps: 25,
            stake_cap: StakeCap::PerAccount(1_000_000 * COIN),
            yield_fee_bps: 100,
            accrual_policy: AccrualPolicy::TwoSegment,
        }
    }

    /// Look up a built-in preset by name (`"monthly"` or `"semi_annual"`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "monthly" => Some(Self::monthly()),
            "semi_annual" | "semi-annual" => Some(Self::semi_annual()),
            _ => None,
        }
    }

    /// Check the parameters describe a usable deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_period_secs == 0 {
            return Err(CurveError::ZeroLockPeriod.into());
        }
        if self.initial_rate_bps > MAX_RATE_BPS {
            return Err(CurveError::RateTooHigh(self.initial_rate_bps).into());
        }
        if self.final_rate_bps > self.initial_rate_bps {
            return Err(CurveError::RatesInverted {
                initial_bps: self.initial_rate_bps,
                final_bps: self.final_rate_bps,
            }
            .into());
        }
        if self.yield_fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(self.yield_fee_bps));
        }
        if self.stake_cap.limit() == 0 {
            return Err(ConfigError::ZeroCap);
        }
        Ok(())
    }

    /// Load from a TOML file, apply `TIDELOCK_*` environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix(CONFIG_ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::finish(settings)
    }

    /// Parse TOML text without environment overrides, then validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::finish(settings)
    }

    fn finish(settings: config::Config) -> Result<Self, ConfigError> {
        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
