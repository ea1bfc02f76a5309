//! Scripted replay of ledger operations against an in-memory asset.
//!
//! A script names accounts with starting balances and lists steps to apply
//! in order. Rejected steps are recorded with their error and the replay
//! moves on, unless the caller asks for strict mode.
//!
//! ```json
//! {
//!   "balances": { "alice": 100000000000 },
//!   "reserve": 1000000000,
//!   "steps": [
//!     { "op": "stake", "account": "alice", "amount": 100000000000 },
//!     { "op": "advance", "days": 180 },
//!     { "op": "withdraw", "account": "alice", "amount": 100000000000 }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tidelock_core::asset::MemoryAsset;
use tidelock_core::config::LedgerConfig;
use tidelock_core::constants::SECONDS_PER_DAY;
use tidelock_core::error::LedgerError;
use tidelock_core::traits::Asset;
use tidelock_core::types::{AccountId, LedgerEvent};
use tidelock_ledger::Ledger;
use tracing::{debug, warn};

const OWNER: &str = "owner";
const CUSTODIAN: &str = "ledger";
const TOKEN: &str = "stake-token";
const DEFAULT_START: u64 = 1_700_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Clock value before the first step.
    #[serde(default)]
    pub start_time: Option<u64>,
    /// Transfer fee charged by the simulated asset.
    #[serde(default)]
    pub transfer_fee_bps: u64,
    /// Starting balance per account label.
    pub balances: BTreeMap<String, u64>,
    /// Reward reserve the owner deposits before the first step.
    #[serde(default)]
    pub reserve: u64,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse script: {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Stake { account: String, amount: u64 },
    Withdraw { account: String, amount: u64 },
    Claim { account: String },
    Update { account: String },
    Advance {
        #[serde(default)]
        days: u64,
        #[serde(default)]
        seconds: u64,
    },
    Deposit { amount: u64 },
    WithdrawFee,
    Pause,
    Unpause,
    Freeze { account: String },
    Unfreeze { account: String },
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub time: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<LedgerEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccountSummary {
    pub balance: u64,
    pub principal: u64,
    pub pending_reward: u64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub time: u64,
    pub total_staked: u64,
    pub reward_reserve: u64,
    pub fee_pool: u64,
    pub custody_balance: u64,
    /// What custody lacks to pay every checkpointed reward.
    pub shortfall: u64,
    pub sound: bool,
    pub accounts: BTreeMap<String, AccountSummary>,
}

#[derive(Debug, Serialize)]
pub struct Replay {
    pub outcomes: Vec<StepOutcome>,
    pub summary: Summary,
}

fn label(name: &str) -> Result<AccountId> {
    AccountId::from_label(name).with_context(|| format!("Invalid account name: {name:?}"))
}

fn account(name: &str) -> Result<AccountId> {
    if name == OWNER || name == CUSTODIAN {
        bail!("Account name {name:?} is reserved");
    }
    label(name)
}

/// Replay `script` on a fresh ledger configured by `config`.
///
/// With `strict`, the first rejected step aborts the replay.
pub fn run(config: LedgerConfig, script: &Script, strict: bool) -> Result<Replay> {
    let asset = Arc::new(MemoryAsset::with_transfer_fee(
        label(TOKEN)?,
        script.transfer_fee_bps,
    ));
    let owner = label(OWNER)?;
    let custodian = label(CUSTODIAN)?;
    let clock = Arc::new(AtomicU64::new(script.start_time.unwrap_or(DEFAULT_START)));
    let source = clock.clone();
    let mut ledger = Ledger::with_clock(config, asset.clone(), custodian, owner, move || {
        source.load(Ordering::SeqCst)
    })
    .context("Failed to create ledger")?;

    let mut accounts = BTreeMap::new();
    for (name, &balance) in &script.balances {
        let id = account(name)?;
        asset.mint(&id, balance).with_context(|| format!("Failed to fund {name}"))?;
        asset.approve(&id, &custodian, u64::MAX);
        accounts.insert(name.clone(), id);
    }
    if script.reserve > 0 {
        asset.mint(&owner, script.reserve).context("Failed to fund owner")?;
        asset.approve(&owner, &custodian, u64::MAX);
        ledger
            .deposit_rewards(&owner, script.reserve)
            .context("Failed to deposit reserve")?;
    }

    let lookup = |name: &str| -> Result<AccountId> {
        accounts
            .get(name)
            .copied()
            .with_context(|| format!("Unknown account {name:?}; add it to balances"))
    };

    let mut outcomes = Vec::with_capacity(script.steps.len());
    for (i, step) in script.steps.iter().enumerate() {
        let result: Result<Vec<LedgerEvent>, LedgerError> = match step {
            Step::Stake { account, amount } => ledger.stake(&lookup(account)?, *amount),
            Step::Withdraw { account, amount } => ledger.withdraw(&lookup(account)?, *amount),
            Step::Claim { account } => ledger.claim(&lookup(account)?),
            Step::Update { account } => ledger.update_reward(&lookup(account)?).map(|_| Vec::new()),
            Step::Advance { days, seconds } => {
                let secs = days
                    .checked_mul(SECONDS_PER_DAY)
                    .and_then(|d| d.checked_add(*seconds))
                    .with_context(|| format!("Step {i}: advance overflows"))?;
                clock.fetch_add(secs, Ordering::SeqCst);
                Ok(Vec::new())
            }
            Step::Deposit { amount } => {
                asset.mint(&owner, *amount).context("Failed to fund owner")?;
                asset.approve(&owner, &custodian, u64::MAX);
                ledger.deposit_rewards(&owner, *amount)
            }
            Step::WithdrawFee => ledger.withdraw_fee(&owner),
            Step::Pause => ledger.pause(&owner),
            Step::Unpause => ledger.unpause(&owner),
            Step::Freeze { account } => ledger.freeze(&owner, lookup(account)?),
            Step::Unfreeze { account } => ledger.unfreeze(&owner, lookup(account)?),
        };

        let time = clock.load(Ordering::SeqCst);
        match result {
            Ok(events) => {
                debug!(step = i, count = events.len(), "step applied");
                outcomes.push(StepOutcome {
                    step: i,
                    time,
                    events,
                    error: None,
                });
            }
            Err(e) => {
                if strict {
                    return Err(e).with_context(|| format!("Step {i} ({step:?}) rejected"));
                }
                warn!(step = i, error = %e, "step rejected");
                outcomes.push(StepOutcome {
                    step: i,
                    time,
                    events: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let mut summaries = BTreeMap::new();
    for (name, id) in &accounts {
        let info = ledger.stake_info(id).context("Failed to read position")?;
        summaries.insert(
            name.clone(),
            AccountSummary {
                balance: asset.balance_of(id),
                principal: info.principal,
                pending_reward: info.pending_reward,
            },
        );
    }
    let audit = ledger.audit().context("Failed to audit ledger")?;
    Ok(Replay {
        outcomes,
        summary: Summary {
            time: clock.load(Ordering::SeqCst),
            total_staked: ledger.total_staked(),
            reward_reserve: ledger.reward_reserve(),
            fee_pool: ledger.total_reward_fee(),
            custody_balance: audit.asset_balance,
            shortfall: audit.shortfall(),
            sound: audit.is_sound(),
            accounts: summaries,
        },
    })
}
