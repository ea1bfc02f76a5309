//! Error types for the Tidelock ledger.
//!
//! `Display` strings are the condition messages surfaced to callers; indexers
//! and front ends match on them, so they are kept stable.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("ERC20: transfer amount exceeds balance")] InsufficientBalance { have: u64, need: u64 },
    #[error("ERC20: transfer amount exceeds allowance")] InsufficientAllowance { allowed: u64, need: u64 },
    #[error("ERC20: transfer to the zero address")] TransferToZero,
    #[error("ERC20: balance overflow")] BalanceOverflow,
    #[error("asset rejected transfer: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("lock period must be greater than zero")] ZeroLockPeriod,
    #[error("final rate {final_bps} exceeds initial rate {initial_bps}")] RatesInverted { initial_bps: u64, final_bps: u64 },
    #[error("rate {0} bps exceeds maximum")] RateTooHigh(u64),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config load: {0}")] Load(String),
    #[error(transparent)] Curve(#[from] CurveError),
    #[error("yield fee {0} bps exceeds maximum")] FeeTooHigh(u64),
    #[error("stake cap must be greater than zero")] ZeroCap,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Pausable: paused")] Paused,
    #[error("Pausable: not paused")] NotPaused,
    #[error("Address is frozen")] Frozen,
    #[error("Cannot stake 0 tokens")] ZeroStake,
    #[error("Not enough tokens to stake")] InsufficientBalance { have: u64, need: u64 },
    #[error("Exceeds max stake amount")] ExceedsMaxStake { requested: u64, cap: u64 },
    #[error("Staking still in lock period")] LockActive { unlocks_at: u64 },
    #[error("Withdrawal amount exceeds staked amount")] ExceedsStaked { staked: u64, requested: u64 },
    #[error("Cannot withdraw 0 tokens")] ZeroWithdraw,
    #[error("No reward to claim")] NothingToClaim,
    #[error("Ownable: caller is not the owner")] NotOwner,
    #[error("caller is not the account or an approved operator")] NotAuthorized,
    #[error("Ownable: new owner is the zero address")] ZeroAddressOwner,
    #[error("no pending ownership transfer")] NoPendingOwnership,
    #[error("Deposit amount must be greater than zero")] ZeroDeposit,
    #[error("No reward fee to withdraw")] NoFeeToWithdraw,
    #[error("Cannot rescue the staking token")] CannotRescueStakingToken,
    #[error("Rescue amount must be greater than zero")] ZeroRescue,
    #[error("Insufficient reward reserve: have {have}, need {need}")] InsufficientReserve { have: u64, need: u64 },
    #[error("Nothing received from transfer")] NothingReceived,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("snapshot: {0}")] Snapshot(String),
    #[error(transparent)] Asset(#[from] AssetError),
    #[error(transparent)] Curve(#[from] CurveError),
    #[error(transparent)] Config(#[from] ConfigError),
}
