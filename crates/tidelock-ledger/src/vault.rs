//! Fee pool and reward reserve.

use serde::{Deserialize, Serialize};
use tidelock_core::error::LedgerError;

/// Balances the ledger holds on top of locked principal.
///
/// `reward_reserve` backs yield payouts and is topped up by the owner;
/// `fee_pool` holds fees that could not be redistributed and is drained by
/// the owner.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct FeeVault {
    pub fee_pool: u64,
    pub reward_reserve: u64,
}

impl FeeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_fee(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.fee_pool = self
            .fee_pool
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Empty the fee pool, returning what it held.
    pub fn take_fees(&mut self) -> Result<u64, LedgerError> {
        if self.fee_pool == 0 {
            return Err(LedgerError::NoFeeToWithdraw);
        }
        Ok(std::mem::take(&mut self.fee_pool))
    }

    pub fn fund_reserve(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.reward_reserve = self
            .reward_reserve
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Fail unless the reserve covers `amount`.
    pub fn ensure_reserve(&self, amount: u64) -> Result<(), LedgerError> {
        if amount > self.reward_reserve {
            return Err(LedgerError::InsufficientReserve {
                have: self.reward_reserve,
                need: amount,
            });
        }
        Ok(())
    }

    pub fn draw_reserve(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.ensure_reserve(amount)?;
        self.reward_reserve -= amount;
        Ok(())
    }

    /// Total the vault accounts for, on top of locked principal.
    pub fn held(&self) -> Result<u64, LedgerError> {
        self.fee_pool
            .checked_add(self.reward_reserve)
            .ok_or(LedgerError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_fees_empties_pool() {
        let mut vault = FeeVault::new();
        vault.credit_fee(40).unwrap();
        vault.credit_fee(2).unwrap();
        assert_eq!(vault.take_fees().unwrap(), 42);
        assert_eq!(vault.fee_pool, 0);
        assert_eq!(vault.take_fees(), Err(LedgerError::NoFeeToWithdraw));
    }

    #[test]
    fn draw_beyond_reserve_fails_without_change() {
        let mut vault = FeeVault::new();
        vault.fund_reserve(10).unwrap();
        assert_eq!(
            vault.draw_reserve(11),
            Err(LedgerError::InsufficientReserve { have: 10, need: 11 })
        );
        assert_eq!(vault.reward_reserve, 10);
        vault.draw_reserve(10).unwrap();
        assert_eq!(vault.reward_reserve, 0);
    }

    #[test]
    fn overflow_fails_closed() {
        let mut vault = FeeVault {
            fee_pool: u64::MAX,
            reward_reserve: 1,
        };
        assert_eq!(vault.credit_fee(1), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(vault.held(), Err(LedgerError::ArithmeticOverflow));
    }
}
