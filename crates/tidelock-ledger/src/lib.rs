//! # tidelock-ledger: Time-locked staking ledger.
//!
//! All accounting uses checked integer arithmetic; overflow rejects the
//! operation instead of wrapping.
//!
//! - **Lazy accrual**: each position is checkpointed only when touched, at
//!   O(1) cost regardless of how many positions exist.
//! - **Index redistribution**: the fee withheld from one account's realized
//!   yield raises a global per-unit index; every other position collects its
//!   share at its next checkpoint.
//! - **Fee vault**: fees with nobody left to share them, plus the reserve
//!   that backs yield payouts.
//! - **Access gate**: owner, pause switch, freeze list, operators.

pub mod accrual;
pub mod gate;
pub mod ledger;
pub mod position;
pub mod snapshot;
pub mod vault;

use std::sync::Arc;

use parking_lot::Mutex;

pub use gate::AccessGate;
pub use ledger::{Audit, Ledger};
pub use position::Position;
pub use snapshot::LedgerState;
pub use vault::FeeVault;

/// A ledger shared between threads. Holding the lock serializes operations.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Wrap `ledger` for shared use.
pub fn shared(ledger: Ledger) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}
