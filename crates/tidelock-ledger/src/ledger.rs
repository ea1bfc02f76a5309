//! The staking ledger.
//!
//! Every mutating operation follows the same shape: validate, stage the new
//! state in locals, move funds through the [`Asset`], then commit. A failure
//! at any step before the commit leaves the ledger untouched.

use std::fmt;
use std::sync::Arc;

use tidelock_core::config::{LedgerConfig, StakeCap};
use tidelock_core::error::LedgerError;
use tidelock_core::traits::{Asset, StakeView, YieldCurve};
use tidelock_core::types::{AccountId, LedgerEvent, StakeInfo, TokenAddress};
use tidelock_curve::LinearDecayCurve;
use tracing::{debug, info, warn};

use crate::accrual;
use crate::position::Position;
use crate::snapshot::LedgerState;
use crate::vault::FeeVault;

/// Outcome of realizing yield, staged but not yet committed.
#[derive(Debug, Clone, Copy)]
struct Settlement {
    fee: u64,
    net: u64,
    global_index: u128,
    vault: FeeVault,
    /// Fee went to the pool because nobody else was locked.
    pooled: bool,
}

/// Balances the ledger accounts for, next to what the asset says it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audit {
    pub total_locked: u64,
    pub sum_principal: u64,
    /// Checkpointed yield owed to positions, before the fee.
    pub sum_accrued: u64,
    pub reward_reserve: u64,
    pub fee_pool: u64,
    pub asset_balance: u64,
}

impl Audit {
    /// Custody covers principal, the reserve, and the fee pool.
    pub fn covers_reserve(&self) -> bool {
        let owed = self.total_locked as u128 + self.reward_reserve as u128 + self.fee_pool as u128;
        self.asset_balance as u128 >= owed
    }

    /// Custody covers principal, every checkpointed reward, and the fee pool.
    ///
    /// Only yield backed by the reserve is guaranteed; an owner who lets the
    /// reserve run short makes this fail until it is topped up.
    pub fn covers_accrued(&self) -> bool {
        let owed = self.total_locked as u128 + self.sum_accrued as u128 + self.fee_pool as u128;
        self.asset_balance as u128 >= owed
    }

    /// Amount the custody balance falls short of what positions are owed.
    pub fn shortfall(&self) -> u64 {
        let owed = self.total_locked as u128 + self.sum_accrued as u128 + self.fee_pool as u128;
        owed.saturating_sub(self.asset_balance as u128)
            .try_into()
            .unwrap_or(u64::MAX)
    }

    /// Principal bookkeeping agrees and custody covers every promise.
    pub fn is_sound(&self) -> bool {
        self.total_locked == self.sum_principal && self.covers_reserve() && self.covers_accrued()
    }
}

/// Time-locked staking ledger over a single asset.
pub struct Ledger {
    config: LedgerConfig,
    curve: LinearDecayCurve,
    asset: Arc<dyn Asset>,
    /// Account holding the ledger's funds on the asset.
    custodian: AccountId,
    state: LedgerState,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("custodian", &self.custodian)
            .field("total_locked", &self.state.total_locked)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Create an empty ledger with the system clock.
    pub fn new(
        config: LedgerConfig,
        asset: Arc<dyn Asset>,
        custodian: AccountId,
        owner: AccountId,
    ) -> Result<Self, LedgerError> {
        Self::with_clock(config, asset, custodian, owner, || {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        })
    }

    /// Create an empty ledger with a custom clock for testing.
    pub fn with_clock(
        config: LedgerConfig,
        asset: Arc<dyn Asset>,
        custodian: AccountId,
        owner: AccountId,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self, LedgerError> {
        if owner.is_zero() {
            return Err(LedgerError::ZeroAddressOwner);
        }
        Self::restore(config, asset, custodian, LedgerState::new(owner), clock)
    }

    /// Resume from previously persisted state.
    pub fn restore(
        config: LedgerConfig,
        asset: Arc<dyn Asset>,
        custodian: AccountId,
        state: LedgerState,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        state.check_totals()?;
        let curve = LinearDecayCurve::from_config(&config)?;
        info!(
            lock_period = config.lock_period_secs,
            initial_rate = config.initial_rate_bps,
            final_rate = config.final_rate_bps,
            positions = state.positions.len(),
            "ledger ready"
        );
        Ok(Self {
            config,
            curve,
            asset,
            custodian,
            state,
            clock: Box::new(clock),
        })
    }

    fn now(&self) -> u64 {
        (self.clock)()
    }

    fn lock_period(&self) -> u64 {
        self.config.lock_period_secs
    }

    /// Position of `account`, or the empty position if it never staked.
    pub fn position(&self, account: &AccountId) -> Position {
        self.state.positions.get(account).copied().unwrap_or_default()
    }

    fn accrue(&self, position: &Position, now: u64) -> Result<Position, LedgerError> {
        accrual::accrue(
            position,
            &self.curve,
            self.config.accrual_policy,
            self.state.global_index,
            now,
        )
    }

    fn custody_balance(&self) -> u64 {
        self.asset.balance_of(&self.custodian)
    }

    fn ensure_matured(&self, position: &Position, now: u64) -> Result<(), LedgerError> {
        if !position.is_matured(now, self.lock_period()) {
            return Err(LedgerError::LockActive {
                unlocks_at: position.unlocks_at(self.lock_period()),
            });
        }
        Ok(())
    }

    fn ensure_within_cap(&self, principal: u64, amount: u64) -> Result<(), LedgerError> {
        let (current, cap) = match self.config.stake_cap {
            StakeCap::PerAccount(cap) => (principal, cap),
            StakeCap::Total(cap) => (self.state.total_locked, cap),
        };
        let resulting = current
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if resulting > cap {
            return Err(LedgerError::ExceedsMaxStake {
                requested: amount,
                cap,
            });
        }
        Ok(())
    }

    /// Price `gross` realized yield: withhold the fee and route it either
    /// into the index over `others_principal` or, if nobody else is locked,
    /// into the fee pool.
    fn settle(&self, gross: u64, others_principal: u64) -> Result<Settlement, LedgerError> {
        let mut vault = self.state.vault;
        vault.ensure_reserve(gross)?;
        let (fee, net) = accrual::split_fee(gross, self.config.yield_fee_bps)?;
        let mut global_index = self.state.global_index;

        if fee > 0 && others_principal > 0 {
            global_index = global_index
                .checked_add(accrual::index_increment(fee, others_principal)?)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            vault.draw_reserve(net)?;
        } else {
            vault.draw_reserve(gross)?;
            vault.credit_fee(fee)?;
        }

        Ok(Settlement {
            fee,
            net,
            global_index,
            vault,
            pooled: fee > 0 && others_principal == 0,
        })
    }

    /// A settlement that moves nothing.
    fn unsettled(&self) -> Settlement {
        Settlement {
            fee: 0,
            net: 0,
            global_index: self.state.global_index,
            vault: self.state.vault,
            pooled: false,
        }
    }

    // --- staking ---

    /// Lock `amount` of the asset from `account`.
    ///
    /// The position is credited with what actually arrived in custody, which
    /// may be less than `amount` if the asset charges for transfers.
    pub fn stake(&mut self, account: &AccountId, amount: u64) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_can_stake(account)?;
        if amount == 0 {
            return Err(LedgerError::ZeroStake);
        }
        let have = self.asset.balance_of(account);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }
        let current = self.position(account);
        self.ensure_within_cap(current.principal, amount)?;

        let now = self.now();
        let mut position = self.accrue(&current, now)?;
        if position.principal == 0 {
            position.lock_start = now;
        }
        // received <= amount, so these bounds also cover the credit below
        if position.principal.checked_add(amount).is_none()
            || self.state.total_locked.checked_add(amount).is_none()
        {
            return Err(LedgerError::ArithmeticOverflow);
        }

        let before = self.custody_balance();
        self.asset.transfer_in(account, &self.custodian, amount)?;
        let received = self.custody_balance().saturating_sub(before).min(amount);
        if received == 0 {
            return Err(LedgerError::NothingReceived);
        }
        if received != amount {
            warn!(account = %account, nominal = amount, received, "asset delivered less than requested");
        }

        position.principal += received;
        self.state.total_locked += received;
        self.state.positions.insert(*account, position);

        info!(account = %account, amount = received, total_locked = self.state.total_locked, "staked");
        Ok(vec![LedgerEvent::Staked {
            account: *account,
            amount: received,
        }])
    }

    /// Withdraw `amount` of principal for the caller, realizing all accrued yield.
    ///
    /// Principal always leaves once the lock has run. If the reward reserve
    /// cannot cover the accrued yield, the yield stays on the position for a
    /// later [`claim`](Self::claim).
    pub fn withdraw(&mut self, account: &AccountId, amount: u64) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.withdraw_for(account, account, amount)
    }

    /// Withdraw on behalf of `account`. `caller` must be the account or an
    /// approved operator; funds always go to `account`.
    pub fn withdraw_for(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        amount: u64,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_acts_for(caller, account)?;
        let now = self.now();
        let current = self.position(account);
        if amount > current.principal {
            return Err(LedgerError::ExceedsStaked {
                staked: current.principal,
                requested: amount,
            });
        }
        self.ensure_matured(&current, now)?;
        if amount == 0 {
            return Err(LedgerError::ZeroWithdraw);
        }

        let mut position = self.accrue(&current, now)?;
        position.principal -= amount;
        let total_locked = self.state.total_locked - amount;
        let others = total_locked - position.principal;
        let settlement = if position.accrued_reward <= self.state.vault.reward_reserve {
            let gross = std::mem::take(&mut position.accrued_reward);
            self.settle(gross, others)?
        } else {
            self.unsettled()
        };
        position.last_global_index = settlement.global_index;

        let payout = amount
            .checked_add(settlement.net)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.asset.transfer_out(&self.custodian, account, payout)?;

        self.state.positions.insert(*account, position);
        self.state.total_locked = total_locked;
        self.commit_settlement(account, &settlement);
        if position.accrued_reward > 0 {
            warn!(
                account = %account,
                pending = position.accrued_reward,
                reserve = self.state.vault.reward_reserve,
                "reward reserve short; yield left pending"
            );
        }

        info!(
            account = %account,
            amount,
            reward = settlement.net,
            fee = settlement.fee,
            "withdrawn"
        );
        let mut events = vec![LedgerEvent::Withdrawn {
            account: *account,
            amount,
        }];
        events.extend(settlement_events(account, &settlement));
        Ok(events)
    }

    /// Pay out the caller's accrued yield, leaving principal locked.
    pub fn claim(&mut self, account: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.claim_for(account, account)
    }

    /// Claim on behalf of `account`. Same authorization as [`withdraw_for`](Self::withdraw_for).
    pub fn claim_for(&mut self, caller: &AccountId, account: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_acts_for(caller, account)?;
        let now = self.now();
        let current = self.position(account);
        self.ensure_matured(&current, now)?;

        let mut position = self.accrue(&current, now)?;
        let gross = std::mem::take(&mut position.accrued_reward);
        if gross == 0 {
            return Err(LedgerError::NothingToClaim);
        }
        let others = self.state.total_locked - position.principal;
        let settlement = self.settle(gross, others)?;
        position.last_global_index = settlement.global_index;

        if settlement.net > 0 {
            self.asset
                .transfer_out(&self.custodian, account, settlement.net)?;
        }

        self.state.positions.insert(*account, position);
        self.commit_settlement(account, &settlement);

        info!(account = %account, reward = settlement.net, fee = settlement.fee, "reward claimed");
        Ok(settlement_events(account, &settlement))
    }

    /// Checkpoint `account` without moving funds. Open to anyone.
    pub fn update_reward(&mut self, account: &AccountId) -> Result<Position, LedgerError> {
        let Some(current) = self.state.positions.get(account).copied() else {
            return Ok(Position::default());
        };
        let now = self.now();
        let position = self.accrue(&current, now)?;
        self.state.positions.insert(*account, position);
        debug!(
            account = %account,
            accrued = position.accrued_reward,
            checkpoint = position.last_checkpoint,
            "reward updated"
        );
        Ok(position)
    }

    fn commit_settlement(&mut self, account: &AccountId, settlement: &Settlement) {
        self.state.global_index = settlement.global_index;
        self.state.vault = settlement.vault;
        if settlement.pooled {
            warn!(account = %account, fee = settlement.fee, "no principal left to share fee; moved to fee pool");
        }
    }

    // --- administration ---

    /// Top up the reward reserve from the owner's balance.
    pub fn deposit_rewards(&mut self, caller: &AccountId, amount: u64) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        if amount == 0 {
            return Err(LedgerError::ZeroDeposit);
        }
        if self.state.vault.reward_reserve.checked_add(amount).is_none() {
            return Err(LedgerError::ArithmeticOverflow);
        }

        let before = self.custody_balance();
        self.asset.transfer_in(caller, &self.custodian, amount)?;
        let received = self.custody_balance().saturating_sub(before).min(amount);
        if received == 0 {
            return Err(LedgerError::NothingReceived);
        }
        let mut vault = self.state.vault;
        vault.fund_reserve(received)?;
        self.state.vault = vault;

        info!(from = %caller, amount = received, reserve = vault.reward_reserve, "rewards deposited");
        Ok(vec![LedgerEvent::RewardsDeposited {
            from: *caller,
            amount: received,
        }])
    }

    /// Send the whole fee pool to the owner.
    pub fn withdraw_fee(&mut self, caller: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        let mut vault = self.state.vault;
        let amount = vault.take_fees()?;
        self.asset.transfer_out(&self.custodian, caller, amount)?;
        self.state.vault = vault;

        info!(to = %caller, amount, "fee withdrawn");
        Ok(vec![LedgerEvent::FeeWithdrawn {
            to: *caller,
            amount,
        }])
    }

    /// Bar `account` from staking. Exits stay open.
    pub fn freeze(&mut self, caller: &AccountId, account: AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        self.state.gate.freeze(account);
        info!(account = %account, "address frozen");
        Ok(vec![LedgerEvent::AddressFrozen { account }])
    }

    /// Lift a freeze.
    pub fn unfreeze(&mut self, caller: &AccountId, account: AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        self.state.gate.unfreeze(&account);
        info!(account = %account, "address unfrozen");
        Ok(vec![LedgerEvent::AddressUnfrozen { account }])
    }

    /// Stop all new stakes.
    pub fn pause(&mut self, caller: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        self.state.gate.pause()?;
        info!("staking paused");
        Ok(vec![LedgerEvent::Paused])
    }

    /// Resume staking after [`pause`](Self::pause).
    pub fn unpause(&mut self, caller: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        self.state.gate.unpause()?;
        info!("staking unpaused");
        Ok(vec![LedgerEvent::Unpaused])
    }

    /// Return a stray `token` balance held in custody to the owner.
    ///
    /// The staking asset itself can never be rescued.
    pub fn rescue_funds(
        &mut self,
        caller: &AccountId,
        token: &dyn Asset,
        amount: u64,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        let address = token.address();
        if address == self.asset.address() {
            return Err(LedgerError::CannotRescueStakingToken);
        }
        if amount == 0 {
            return Err(LedgerError::ZeroRescue);
        }
        token.transfer_out(&self.custodian, caller, amount)?;

        info!(token = %address, amount, "funds rescued");
        Ok(vec![LedgerEvent::FundsRescued {
            token: address,
            amount,
        }])
    }

    /// Nominate a new owner; they must call [`accept_ownership`](Self::accept_ownership).
    pub fn transfer_ownership(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.ensure_owner(caller)?;
        self.state.gate.nominate(new_owner)?;
        info!(from = %caller, to = %new_owner, "ownership transfer started");
        Ok(vec![LedgerEvent::OwnershipTransferStarted {
            from: *caller,
            to: new_owner,
        }])
    }

    pub fn accept_ownership(&mut self, caller: &AccountId) -> Result<Vec<LedgerEvent>, LedgerError> {
        let previous = self.state.gate.accept(caller)?;
        info!(from = %previous, to = %caller, "ownership transferred");
        Ok(vec![LedgerEvent::OwnershipTransferred {
            from: previous,
            to: *caller,
        }])
    }

    /// Let `operator` withdraw and claim for `account` (the caller).
    pub fn set_operator(
        &mut self,
        account: &AccountId,
        operator: AccountId,
        approved: bool,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.state.gate.set_operator(*account, operator, approved);
        debug!(account = %account, operator = %operator, approved, "operator set");
        Ok(vec![LedgerEvent::OperatorSet {
            account: *account,
            operator,
            approved,
        }])
    }

    // --- queries ---

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn curve(&self) -> &LinearDecayCurve {
        &self.curve
    }

    pub fn custodian(&self) -> AccountId {
        self.custodian
    }

    pub fn asset_address(&self) -> TokenAddress {
        self.asset.address()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn total_staked(&self) -> u64 {
        self.state.total_locked
    }

    pub fn total_stake_of(&self, account: &AccountId) -> u64 {
        self.position(account).principal
    }

    /// Fees held for the owner.
    pub fn total_reward_fee(&self) -> u64 {
        self.state.vault.fee_pool
    }

    pub fn reward_reserve(&self) -> u64 {
        self.state.vault.reward_reserve
    }

    pub fn global_index(&self) -> u128 {
        self.state.global_index
    }

    pub fn is_frozen(&self, account: &AccountId) -> bool {
        self.state.gate.is_frozen(account)
    }

    pub fn is_paused(&self) -> bool {
        self.state.gate.is_paused()
    }

    pub fn owner(&self) -> AccountId {
        self.state.gate.owner()
    }

    pub fn is_operator(&self, account: &AccountId, operator: &AccountId) -> bool {
        self.state.gate.is_operator(account, operator)
    }

    /// Current view of `account` as if it were checkpointed now. Does not
    /// modify the ledger.
    pub fn stake_info(&self, account: &AccountId) -> Result<StakeInfo, LedgerError> {
        let now = self.now();
        let position = self.position(account);
        let preview = self.accrue(&position, now)?;
        let current_rate = if position.principal == 0 {
            0
        } else {
            self.curve.rate_between(position.lock_start, now)
        };
        Ok(StakeInfo {
            principal: preview.principal,
            lock_start: preview.lock_start,
            current_rate,
            pending_reward: preview.accrued_reward,
        })
    }

    /// Compare bookkeeping against the custody balance.
    pub fn audit(&self) -> Result<Audit, LedgerError> {
        let (mut sum_principal, mut sum_accrued) = (0u64, 0u64);
        for p in self.state.positions.values() {
            sum_principal = sum_principal
                .checked_add(p.principal)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            sum_accrued = sum_accrued
                .checked_add(p.accrued_reward)
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }
        Ok(Audit {
            total_locked: self.state.total_locked,
            sum_principal,
            sum_accrued,
            reward_reserve: self.state.vault.reward_reserve,
            fee_pool: self.state.vault.fee_pool,
            asset_balance: self.custody_balance(),
        })
    }

    /// Serialize accounting state for [`restore`](Self::restore).
    pub fn snapshot(&self) -> Result<Vec<u8>, LedgerError> {
        self.state.encode()
    }
}

fn settlement_events(account: &AccountId, settlement: &Settlement) -> Vec<LedgerEvent> {
    let mut events = Vec::new();
    if settlement.net > 0 {
        events.push(LedgerEvent::RewardClaimed {
            account: *account,
            amount: settlement.net,
        });
    }
    if settlement.fee > 0 {
        events.push(LedgerEvent::FeeCollected {
            amount: settlement.fee,
        });
    }
    events
}

impl StakeView for Ledger {
    fn staked_amount_and_rate(&self, account: &AccountId) -> Result<StakeInfo, LedgerError> {
        self.stake_info(account)
    }

    fn refresh(&mut self, account: &AccountId) -> Result<(), LedgerError> {
        self.update_reward(account).map(|_| ())
    }
}
