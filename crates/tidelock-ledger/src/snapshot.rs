//! Persistent ledger state and its byte encoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tidelock_core::error::LedgerError;
use tidelock_core::types::AccountId;

use crate::gate::AccessGate;
use crate::position::Position;
use crate::vault::FeeVault;

/// Format tag written ahead of every snapshot.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Everything the ledger must keep across restarts.
///
/// Configuration, the asset handle, and the clock are supplied again on
/// restore; only accounting state lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct LedgerState {
    pub positions: HashMap<AccountId, Position>,
    /// Sum of every position's principal.
    pub total_locked: u64,
    /// Redistributed fee per unit of locked principal, scaled by `INDEX_PRECISION`.
    pub global_index: u128,
    pub vault: FeeVault,
    pub gate: AccessGate,
}

impl LedgerState {
    pub fn new(owner: AccountId) -> Self {
        Self {
            positions: HashMap::new(),
            total_locked: 0,
            global_index: 0,
            vault: FeeVault::new(),
            gate: AccessGate::new(owner),
        }
    }

    /// Encode as `[version, bincode(state)]`.
    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        let mut bytes = vec![SNAPSHOT_VERSION];
        let body = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode bytes written by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, LedgerError> {
        let (version, body) = bytes
            .split_first()
            .ok_or_else(|| LedgerError::Snapshot("empty snapshot".into()))?;
        if *version != SNAPSHOT_VERSION {
            return Err(LedgerError::Snapshot(format!(
                "unsupported snapshot version {version}"
            )));
        }
        let (state, read): (Self, usize) =
            bincode::decode_from_slice(body, bincode::config::standard())
                .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        if read != body.len() {
            return Err(LedgerError::Snapshot(format!(
                "{} trailing bytes",
                body.len() - read
            )));
        }
        state.check_totals()?;
        Ok(state)
    }

    /// `total_locked` must equal the sum of principals.
    pub fn check_totals(&self) -> Result<(), LedgerError> {
        let sum = self
            .positions
            .values()
            .try_fold(0u64, |acc, p| acc.checked_add(p.principal))
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if sum != self.total_locked {
            return Err(LedgerError::Snapshot(format!(
                "total locked {} does not match positions {}",
                self.total_locked, sum
            )));
        }
        Ok(())
    }
}
