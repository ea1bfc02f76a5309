//! In-memory [`Asset`] implementation.
//!
//! [`MemoryAsset`] models an allowance-based token with an optional burn-on-
//! transfer fee and a failure switch. It backs the CLI simulator and the test
//! suites; production deployments plug in their own [`Asset`].

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::constants::BPS_PRECISION;
use crate::error::AssetError;
use crate::traits::Asset;
use crate::types::{AccountId, TokenAddress};

#[derive(Debug, Default)]
struct AssetState {
    balances: HashMap<AccountId, u64>,
    /// (owner, spender) → remaining allowance.
    allowances: HashMap<(AccountId, AccountId), u64>,
    total_supply: u64,
    burned: u64,
    /// When set, every transfer is rejected with this reason.
    failure: Option<String>,
}

/// Thread-safe in-memory token ledger.
#[derive(Debug)]
pub struct MemoryAsset {
    address: TokenAddress,
    /// Share of every transfer burned in transit, in basis points.
    transfer_fee_bps: u64,
    state: Mutex<AssetState>,
}

impl MemoryAsset {
    /// Create a fee-less token at `address`.
    pub fn new(address: TokenAddress) -> Self {
        Self::with_transfer_fee(address, 0)
    }

    /// Create a token that burns `transfer_fee_bps` of every transfer.
    ///
    /// The fee is capped at 100%.
    pub fn with_transfer_fee(address: TokenAddress, transfer_fee_bps: u64) -> Self {
        Self {
            address,
            transfer_fee_bps: transfer_fee_bps.min(BPS_PRECISION),
            state: Mutex::new(AssetState::default()),
        }
    }

    /// Credit `amount` new tokens to `to`.
    pub fn mint(&self, to: &AccountId, amount: u64) -> Result<(), AssetError> {
        if to.is_zero() {
            return Err(AssetError::TransferToZero);
        }
        let mut state = self.state.lock();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(AssetError::BalanceOverflow)?;
        let balance = state.balances.get(to).copied().unwrap_or(0);
        let balance = balance.checked_add(amount).ok_or(AssetError::BalanceOverflow)?;
        state.total_supply = supply;
        state.balances.insert(*to, balance);
        Ok(())
    }

    /// Set the allowance `owner` grants to `spender`, replacing any previous one.
    pub fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u64) {
        self.state.lock().allowances.insert((*owner, *spender), amount);
    }

    /// Remaining allowance `owner` granted to `spender`.
    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.state
            .lock()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Direct transfer signed by `from` (no allowance involved).
    pub fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), AssetError> {
        let mut state = self.state.lock();
        self.move_balance(&mut state, from, to, amount)
    }

    /// Make every subsequent transfer fail with `reason`, or clear with `None`.
    pub fn set_failure(&self, reason: Option<&str>) {
        self.state.lock().failure = reason.map(str::to_string);
    }

    pub fn total_supply(&self) -> u64 {
        self.state.lock().total_supply
    }

    /// Total burned by transfer fees so far.
    pub fn burned(&self) -> u64 {
        self.state.lock().burned
    }

    pub fn transfer_fee_bps(&self) -> u64 {
        self.transfer_fee_bps
    }

    fn move_balance(
        &self,
        state: &mut AssetState,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError> {
        if let Some(reason) = &state.failure {
            return Err(AssetError::Rejected(reason.clone()));
        }
        if to.is_zero() {
            return Err(AssetError::TransferToZero);
        }
        let have = state.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        }

        // fee <= amount since transfer_fee_bps <= BPS_PRECISION
        let fee = (amount as u128 * self.transfer_fee_bps as u128 / BPS_PRECISION as u128) as u64;
        let received = amount - fee;

        if from != to {
            let to_balance = state.balances.get(to).copied().unwrap_or(0);
            let to_balance = to_balance
                .checked_add(received)
                .ok_or(AssetError::BalanceOverflow)?;
            state.balances.insert(*from, have - amount);
            state.balances.insert(*to, to_balance);
        } else {
            state.balances.insert(*from, have - fee);
        }
        state.total_supply -= fee;
        state.burned += fee;
        Ok(())
    }
}

impl Asset for MemoryAsset {
    fn address(&self) -> TokenAddress {
        self.address
    }

    fn balance_of(&self, account: &AccountId) -> u64 {
        self.state.lock().balances.get(account).copied().unwrap_or(0)
    }

    fn transfer_in(
        &self,
        from: &AccountId,
        custodian: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError> {
        let mut state = self.state.lock();
        let allowed = state
            .allowances
            .get(&(*from, *custodian))
            .copied()
            .unwrap_or(0);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance { allowed, need: amount });
        }
        self.move_balance(&mut state, from, custodian, amount)?;
        state.allowances.insert((*from, *custodian), allowed - amount);
        Ok(())
    }

    fn transfer_out(
        &self,
        custodian: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), AssetError> {
        let mut state = self.state.lock();
        self.move_balance(&mut state, custodian, to, amount)
    }
}
