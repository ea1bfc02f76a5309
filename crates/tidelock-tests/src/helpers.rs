//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tidelock_core::asset::MemoryAsset;
use tidelock_core::config::LedgerConfig;
use tidelock_core::constants::{COIN, SECONDS_PER_DAY};
use tidelock_core::traits::Asset;
use tidelock_core::types::AccountId;
use tidelock_ledger::Ledger;

/// Arbitrary fixed start time for every test clock.
pub const GENESIS_TIME: u64 = 1_700_000_000;

pub const DAY: u64 = SECONDS_PER_DAY;

/// Reserve deposited by the owner in [`TestBed::funded`].
pub const DEFAULT_RESERVE: u64 = 100_000 * COIN;

/// Account from a short label.
pub fn acct(label: &str) -> AccountId {
    AccountId::from_label(label).expect("label fits in 32 bytes")
}

/// Account from an index, for generated populations.
pub fn nth(i: u32) -> AccountId {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&i.to_be_bytes());
    bytes[31] = 0xA5;
    AccountId::from_bytes(bytes)
}

/// Clock shared between a test and its ledger.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn source(&self) -> impl Fn() -> u64 + Send + Sync + 'static {
        let inner = self.0.clone();
        move || inner.load(Ordering::SeqCst)
    }
}

/// A ledger wired to a [`MemoryAsset`] and a [`ManualClock`].
pub struct TestBed {
    pub ledger: Ledger,
    pub asset: Arc<MemoryAsset>,
    pub clock: ManualClock,
    pub owner: AccountId,
    pub custodian: AccountId,
}

impl TestBed {
    /// Fresh ledger with no reserve.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_asset(config, MemoryAsset::new(acct("stake-token")))
    }

    /// Fresh ledger whose owner has deposited [`DEFAULT_RESERVE`].
    pub fn funded(config: LedgerConfig) -> Self {
        let mut bed = Self::new(config);
        let owner = bed.owner;
        bed.ledger
            .deposit_rewards(&owner, DEFAULT_RESERVE)
            .expect("owner can fund reserve");
        bed
    }

    pub fn with_asset(config: LedgerConfig, asset: MemoryAsset) -> Self {
        let asset = Arc::new(asset);
        let clock = ManualClock::new(GENESIS_TIME);
        let owner = acct("owner");
        let custodian = acct("ledger");
        let ledger = Ledger::with_clock(config, asset.clone(), custodian, owner, clock.source())
            .expect("valid ledger");
        asset.mint(&owner, 10 * DEFAULT_RESERVE).expect("mint");
        asset.approve(&owner, &custodian, u64::MAX);
        Self {
            ledger,
            asset,
            clock,
            owner,
            custodian,
        }
    }

    /// Mint `balance` to `who` and approve the ledger for all of it.
    pub fn enroll(&self, who: AccountId, balance: u64) -> AccountId {
        self.asset.mint(&who, balance).expect("mint");
        self.asset.approve(&who, &self.custodian, u64::MAX);
        who
    }

    pub fn balance(&self, who: &AccountId) -> u64 {
        self.asset.balance_of(who)
    }

    /// Panic unless the ledger's books are sound.
    pub fn assert_sound(&self) {
        let audit = self.ledger.audit().expect("audit sums fit");
        assert!(audit.is_sound(), "unsound ledger: {audit:?}");
    }
}
