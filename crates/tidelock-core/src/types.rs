//! Identity and event types shared by the ledger, its collaborators, and indexers.
//!
//! All monetary values are in base units (1 token = 10^8 base units).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte account address.
///
/// Addresses are opaque to the ledger. Short human labels (`"alice"`) are
/// accepted as a convenience: the label bytes are left-aligned and
/// zero-padded, and such addresses display as the label again.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

/// Address of a token contract; tokens share the account address space.
pub type TokenAddress = AccountId;

impl AccountId {
    /// The zero address. Never a valid owner or recipient.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Address filled with a single byte. Handy for fixtures.
    pub fn from_seed(seed: u8) -> Self {
        Self([seed; 32])
    }

    /// Address derived from a short label. Returns `None` for empty labels
    /// or labels longer than 32 bytes.
    pub fn from_label(label: &str) -> Option<Self> {
        let bytes = label.as_bytes();
        if bytes.is_empty() || bytes.len() > 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out[..bytes.len()].copy_from_slice(bytes);
        Some(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The label this address was built from, if it looks like one.
    fn label(&self) -> Option<&str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(32);
        if end == 0 || self.0[end..].iter().any(|&b| b != 0) {
            return None;
        }
        let text = std::str::from_utf8(&self.0[..end]).ok()?;
        text.chars()
            .all(|c| c.is_ascii_graphic())
            .then_some(text)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.label() {
            return f.write_str(label);
        }
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for AccountId {
    type Err = String;

    /// Parses 64 hex characters as raw bytes, anything else as a label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            let mut out = [0u8; 32];
            for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
                let pair = std::str::from_utf8(chunk).map_err(|e| e.to_string())?;
                out[i] = u8::from_str_radix(pair, 16).map_err(|e| e.to_string())?;
            }
            return Ok(Self(out));
        }
        Self::from_label(s).ok_or_else(|| format!("invalid account: {s:?}"))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Events emitted by ledger operations, in emission order.
///
/// Amounts are the amounts that actually moved: `Staked` carries the amount
/// received into custody, `RewardClaimed` the net yield after the fee.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum LedgerEvent {
    Staked { account: AccountId, amount: u64 },
    Withdrawn { account: AccountId, amount: u64 },
    RewardClaimed { account: AccountId, amount: u64 },
    FeeCollected { amount: u64 },
    AddressFrozen { account: AccountId },
    AddressUnfrozen { account: AccountId },
    Paused,
    Unpaused,
    RewardsDeposited { from: AccountId, amount: u64 },
    FeeWithdrawn { to: AccountId, amount: u64 },
    FundsRescued { token: TokenAddress, amount: u64 },
    OwnershipTransferStarted { from: AccountId, to: AccountId },
    OwnershipTransferred { from: AccountId, to: AccountId },
    OperatorSet { account: AccountId, operator: AccountId, approved: bool },
}

/// Read model of one position, as handed to the voting collaborator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StakeInfo {
    /// Amount currently locked.
    pub principal: u64,
    /// Start of the current lock.
    pub lock_start: u64,
    /// Yield rate in force right now, in hundredths of a percent per year.
    pub current_rate: u64,
    /// Accrued plus not-yet-checkpointed yield, before the fee.
    pub pending_reward: u64,
}
