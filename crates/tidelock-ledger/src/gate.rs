//! Ownership, pause switch, freeze list, and operator approvals.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tidelock_core::error::LedgerError;
use tidelock_core::types::AccountId;

/// Who may do what.
///
/// The gate only answers questions and records flags; the ledger decides
/// which operations consult it. Pause and freeze block new stakes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct AccessGate {
    owner: AccountId,
    pending_owner: Option<AccountId>,
    paused: bool,
    frozen: BTreeSet<AccountId>,
    /// `(account, operator)` pairs.
    operators: BTreeSet<(AccountId, AccountId)>,
}

impl AccessGate {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            pending_owner: None,
            paused: false,
            frozen: BTreeSet::new(),
            operators: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<AccountId> {
        self.pending_owner
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_frozen(&self, account: &AccountId) -> bool {
        self.frozen.contains(account)
    }

    pub fn is_operator(&self, account: &AccountId, operator: &AccountId) -> bool {
        self.operators.contains(&(*account, *operator))
    }

    pub fn ensure_owner(&self, caller: &AccountId) -> Result<(), LedgerError> {
        if *caller != self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    /// `caller` may move `account`'s funds.
    pub fn ensure_acts_for(&self, caller: &AccountId, account: &AccountId) -> Result<(), LedgerError> {
        if caller == account || self.is_operator(account, caller) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized)
    }

    /// Checks consulted before a new stake, in order: pause, then freeze.
    pub fn ensure_can_stake(&self, account: &AccountId) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        if self.is_frozen(account) {
            return Err(LedgerError::Frozen);
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self) -> Result<(), LedgerError> {
        if !self.paused {
            return Err(LedgerError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }

    pub fn freeze(&mut self, account: AccountId) {
        self.frozen.insert(account);
    }

    pub fn unfreeze(&mut self, account: &AccountId) {
        self.frozen.remove(account);
    }

    pub fn set_operator(&mut self, account: AccountId, operator: AccountId, approved: bool) {
        if approved {
            self.operators.insert((account, operator));
        } else {
            self.operators.remove(&(account, operator));
        }
    }

    /// Nominate `new_owner`; takes effect once they accept.
    pub fn nominate(&mut self, new_owner: AccountId) -> Result<(), LedgerError> {
        if new_owner.is_zero() {
            return Err(LedgerError::ZeroAddressOwner);
        }
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    /// Complete a nomination. Returns the previous owner.
    pub fn accept(&mut self, caller: &AccountId) -> Result<AccountId, LedgerError> {
        match self.pending_owner {
            None => Err(LedgerError::NoPendingOwnership),
            Some(pending) if pending != *caller => Err(LedgerError::NotAuthorized),
            Some(pending) => {
                self.pending_owner = None;
                Ok(std::mem::replace(&mut self.owner, pending))
            }
        }
    }
}
