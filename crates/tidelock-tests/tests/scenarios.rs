//! End-to-end ledger scenarios.
//!
//! Each test builds a fresh ledger over an in-memory asset, drives it through
//! a realistic sequence of stakes, clock advances, and exits, and checks
//! balances, events, and the ledger's own books afterwards.

use tidelock_core::asset::MemoryAsset;
use tidelock_core::config::{AccrualPolicy, LedgerConfig, StakeCap};
use tidelock_core::constants::{COIN, SECONDS_PER_YEAR};
use tidelock_core::error::{AssetError, LedgerError};
use tidelock_core::traits::{Asset, StakeView, YieldCurve};
use tidelock_core::types::{AccountId, LedgerEvent};
use tidelock_tests::helpers::*;

/// Base yield of `principal` at `rate` over `secs`, the single-segment formula.
fn simple_yield(principal: u64, rate: u64, secs: u64) -> u64 {
    (principal as u128 * rate as u128 * secs as u128 / SECONDS_PER_YEAR as u128 / 10_000) as u64
}

// ---------------------------------------------------------------------------
// Rate curve through the ledger
// ---------------------------------------------------------------------------

#[test]
fn thirty_days_accrues_at_initial_rate() {
    for config in [LedgerConfig::monthly(), LedgerConfig::semi_annual()] {
        let mut bed = TestBed::new(config);
        let alice = bed.enroll(acct("alice"), 1000 * COIN);
        bed.ledger.stake(&alice, 1000 * COIN).unwrap();
        bed.clock.advance(30 * DAY);

        let pos = bed.ledger.update_reward(&alice).unwrap();
        assert_eq!(
            pos.accrued_reward,
            1000 * COIN * config.initial_rate_bps * 30 / 365 / 10_000
        );
    }
}

#[test]
fn half_lock_reports_midpoint_rate() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(90 * DAY);

    bed.ledger.refresh(&alice).unwrap();
    let info = bed.ledger.staked_amount_and_rate(&alice).unwrap();
    assert_eq!(info.current_rate, (45 + 25) / 2);
    assert_eq!(info.pending_reward, simple_yield(1000 * COIN, 45, 90 * DAY));
}

#[test]
fn rate_drops_during_lock_and_holds_after() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();

    let mut last = bed.ledger.stake_info(&alice).unwrap().current_rate;
    assert_eq!(last, 45);
    for _ in 0..40 {
        bed.clock.advance(10 * DAY);
        let rate = bed.ledger.stake_info(&alice).unwrap().current_rate;
        assert!(rate <= last);
        assert!(rate >= 25);
        last = rate;
    }
    assert_eq!(last, 25);
}

#[test]
fn frequent_checkpoints_track_the_curve() {
    // Daily checkpoints: each day priced at that day's opening rate.
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();

    let curve = *bed.ledger.curve();
    let mut expected = 0u64;
    for day in 0..180 {
        expected += simple_yield(1000 * COIN, curve.rate_at(day * DAY), DAY);
        bed.clock.advance(DAY);
        bed.ledger.update_reward(&alice).unwrap();
    }
    assert_eq!(bed.ledger.position(&alice).accrued_reward, expected);

    // The decayed total is well below a flat initial rate.
    assert!(expected < simple_yield(1000 * COIN, 45, 180 * DAY));
    assert!(expected > simple_yield(1000 * COIN, 25, 180 * DAY));
}

#[test]
fn single_long_checkpoint_policies() {
    let mut sample = LedgerConfig::semi_annual();
    sample.accrual_policy = AccrualPolicy::CheckpointSample;
    let mut split = LedgerConfig::semi_annual();
    split.accrual_policy = AccrualPolicy::TwoSegment;

    let mut rewards = Vec::new();
    for config in [sample, split] {
        let mut bed = TestBed::new(config);
        let alice = bed.enroll(acct("alice"), 1000 * COIN);
        bed.ledger.stake(&alice, 1000 * COIN).unwrap();
        bed.clock.advance(200 * DAY);
        rewards.push(bed.ledger.update_reward(&alice).unwrap().accrued_reward);
    }

    // One sample at `now`: the whole 200 days at the final rate.
    assert_eq!(rewards[0], simple_yield(1000 * COIN, 25, 200 * DAY));
    // Split at lock end: 180 days at the opening rate, 20 at the final rate.
    assert_eq!(
        rewards[1],
        simple_yield(1000 * COIN, 45, 180 * DAY) + simple_yield(1000 * COIN, 25, 20 * DAY)
    );
}

// ---------------------------------------------------------------------------
// Fee redistribution
// ---------------------------------------------------------------------------

/// Stake `principals`, mature, checkpoint everyone but the last, then have
/// the last account exit. Returns each remaining account's redistributed gain.
fn exit_and_measure(principals: &[u64]) -> (Vec<u64>, u64) {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let accounts: Vec<_> = principals
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let who = bed.enroll(nth(i as u32), p);
            bed.ledger.stake(&who, p).unwrap();
            who
        })
        .collect();
    bed.clock.advance(180 * DAY);

    let (leaver, stayers) = accounts.split_last().unwrap();
    let before: Vec<u64> = stayers
        .iter()
        .map(|a| bed.ledger.update_reward(a).unwrap().accrued_reward)
        .collect();

    let events = bed.ledger.withdraw(leaver, *principals.last().unwrap()).unwrap();
    let fee = events
        .iter()
        .find_map(|e| match e {
            LedgerEvent::FeeCollected { amount } => Some(*amount),
            _ => None,
        })
        .expect("exit with yield pays a fee");

    let gains = stayers
        .iter()
        .zip(before)
        .map(|(a, b)| bed.ledger.update_reward(a).unwrap().accrued_reward - b)
        .collect();
    bed.assert_sound();
    (gains, fee)
}

#[test]
fn exit_fee_is_shared_evenly_between_equal_stakers() {
    let (gains, fee) = exit_and_measure(&[1000 * COIN, 1000 * COIN, 1000 * COIN]);
    assert!(fee > 0);
    assert!(gains[0].abs_diff(gains[1]) <= 1);
    let shared: u64 = gains.iter().sum();
    assert!(shared <= fee);
    assert!(fee - shared <= 2);
}

#[test]
fn exit_fee_is_shared_in_proportion_to_principal() {
    let (gains, fee) = exit_and_measure(&[1000 * COIN, 3000 * COIN, 2000 * COIN]);
    // gain / principal equal within one unit of rounding
    assert!((gains[0] * 3).abs_diff(gains[1]) <= 3);
    assert!(gains.iter().sum::<u64>() <= fee);
}

#[test]
fn last_staker_exit_sends_fee_to_pool() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let bob = bed.enroll(acct("bob"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 1000 * COIN).unwrap();
    bed.clock.advance(180 * DAY);

    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();
    assert_eq!(bed.ledger.total_reward_fee(), 0);
    let index_after_alice = bed.ledger.global_index();
    assert!(index_after_alice > 0);

    let events = bed.ledger.withdraw(&bob, 1000 * COIN).unwrap();
    let fee = match events.last() {
        Some(LedgerEvent::FeeCollected { amount }) => *amount,
        other => panic!("expected fee event last, got {other:?}"),
    };
    assert_eq!(bed.ledger.global_index(), index_after_alice);
    assert_eq!(bed.ledger.total_reward_fee(), fee);
    assert_eq!(bed.ledger.total_staked(), 0);
    bed.assert_sound();

    let owner = bed.owner;
    let before = bed.balance(&owner);
    assert_eq!(
        bed.ledger.withdraw_fee(&owner).unwrap(),
        vec![LedgerEvent::FeeWithdrawn { to: owner, amount: fee }]
    );
    assert_eq!(bed.balance(&owner), before + fee);
    assert_eq!(
        bed.ledger.withdraw_fee(&owner).unwrap_err().to_string(),
        "No reward fee to withdraw"
    );
}

#[test]
fn late_joiner_does_not_receive_earlier_fees() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let bob = bed.enroll(acct("bob"), 1000 * COIN);
    let carol = bed.enroll(acct("carol"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 1000 * COIN).unwrap();
    bed.clock.advance(180 * DAY);
    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();

    bed.ledger.stake(&carol, 1000 * COIN).unwrap();
    let pos = bed.ledger.update_reward(&carol).unwrap();
    assert_eq!(pos.accrued_reward, 0);
    assert_eq!(pos.last_global_index, bed.ledger.global_index());
}

#[test]
fn claim_fee_is_shared_too() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let bob = bed.enroll(acct("bob"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 1000 * COIN).unwrap();
    bed.clock.advance(180 * DAY);
    let bob_before = bed.ledger.update_reward(&bob).unwrap().accrued_reward;

    let events = bed.ledger.claim(&alice).unwrap();
    let (net, fee) = match events.as_slice() {
        [LedgerEvent::RewardClaimed { amount: net, .. }, LedgerEvent::FeeCollected { amount: fee }] => (*net, *fee),
        other => panic!("unexpected events {other:?}"),
    };
    assert_eq!(bed.balance(&alice), net);
    assert_eq!(bed.ledger.total_stake_of(&alice), 1000 * COIN);

    let bob_after = bed.ledger.update_reward(&bob).unwrap().accrued_reward;
    assert!((bob_after - bob_before).abs_diff(fee) <= 1);
    // Alice does not get a cut of her own fee.
    assert_eq!(bed.ledger.update_reward(&alice).unwrap().accrued_reward, 0);
    bed.assert_sound();
}

// ---------------------------------------------------------------------------
// Checkpoints and views
// ---------------------------------------------------------------------------

#[test]
fn update_reward_twice_changes_nothing_the_second_time() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(17 * DAY);

    let first = bed.ledger.update_reward(&alice).unwrap();
    let second = bed.ledger.update_reward(&alice).unwrap();
    assert!(first.accrued_reward > 0);
    assert_eq!(first, second);
}

#[test]
fn anyone_may_checkpoint_any_account() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(DAY);
    // update_reward takes no caller; the voting side refreshes before reading
    bed.ledger.refresh(&alice).unwrap();
    let info = bed.ledger.staked_amount_and_rate(&alice).unwrap();
    assert_eq!(info.pending_reward, bed.ledger.position(&alice).accrued_reward);
    assert!(bed.ledger.has_stake(&alice).unwrap());
}

// ---------------------------------------------------------------------------
// Lock enforcement and gates
// ---------------------------------------------------------------------------

#[test]
fn nothing_leaves_before_maturity() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();

    for elapsed in [0, DAY, 90 * DAY, 180 * DAY - 1] {
        bed.clock.advance(elapsed.saturating_sub(bed.clock.now() - GENESIS_TIME));
        for amount in [0, 1, 500 * COIN, 1000 * COIN] {
            let err = bed.ledger.withdraw(&alice, amount).unwrap_err();
            assert_eq!(err.to_string(), "Staking still in lock period");
        }
        assert!(matches!(bed.ledger.claim(&alice), Err(LedgerError::LockActive { .. })));
    }
    assert_eq!(bed.balance(&alice), 0);

    bed.clock.advance(1);
    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();
}

#[test]
fn top_up_does_not_restart_the_lock() {
    let mut bed = TestBed::funded(LedgerConfig::monthly());
    let alice = bed.enroll(acct("alice"), 2000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(20 * DAY);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(10 * DAY);
    bed.ledger.withdraw(&alice, 2000 * COIN).unwrap();
}

#[test]
fn halted_ledger_still_lets_everyone_out() {
    let mut bed = TestBed::funded(LedgerConfig::monthly());
    let owner = bed.owner;
    let alice = bed.enroll(acct("alice"), 2000 * COIN);
    let bob = bed.enroll(acct("bob"), 2000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 1000 * COIN).unwrap();

    assert_eq!(bed.ledger.pause(&owner).unwrap(), vec![LedgerEvent::Paused]);
    bed.ledger.freeze(&owner, bob).unwrap();
    assert_eq!(bed.ledger.stake(&alice, COIN).unwrap_err().to_string(), "Pausable: paused");
    assert_eq!(bed.ledger.stake(&bob, COIN).unwrap_err().to_string(), "Pausable: paused");

    bed.clock.advance(30 * DAY);
    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();
    bed.ledger.claim(&bob).unwrap();
    bed.ledger.withdraw(&bob, 1000 * COIN).unwrap();
    assert_eq!(bed.ledger.total_staked(), 0);

    bed.ledger.unpause(&owner).unwrap();
    assert_eq!(bed.ledger.stake(&bob, COIN), Err(LedgerError::Frozen));
    bed.ledger.stake(&alice, COIN).unwrap();
    bed.assert_sound();
}

#[test]
fn cap_boundaries() {
    let mut bed = TestBed::new(LedgerConfig::monthly());
    let alice = bed.enroll(acct("alice"), 600_000 * COIN);
    bed.ledger.stake(&alice, 500_000 * COIN).unwrap();
    assert!(matches!(
        bed.ledger.stake(&alice, 1),
        Err(LedgerError::ExceedsMaxStake { cap, .. }) if cap == 500_000 * COIN
    ));

    let mut config = LedgerConfig::monthly();
    config.stake_cap = StakeCap::Total(1_500 * COIN);
    let mut bed = TestBed::new(config);
    let who: Vec<_> = (0..3).map(|i| bed.enroll(nth(i), 1_000 * COIN)).collect();
    bed.ledger.stake(&who[0], 1_000 * COIN).unwrap();
    bed.ledger.stake(&who[1], 500 * COIN).unwrap();
    assert_eq!(
        bed.ledger.stake(&who[2], 1).unwrap_err().to_string(),
        "Exceeds max stake amount"
    );
}

// ---------------------------------------------------------------------------
// External asset behaviour
// ---------------------------------------------------------------------------

#[test]
fn taxed_asset_credits_what_arrives() {
    let asset = MemoryAsset::with_transfer_fee(acct("taxed"), 200);
    let mut bed = TestBed::with_asset(LedgerConfig::monthly(), asset);
    let owner = bed.owner;
    bed.ledger.deposit_rewards(&owner, 1_000 * COIN).unwrap();
    assert_eq!(bed.ledger.reward_reserve(), 980 * COIN);

    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let events = bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    assert_eq!(
        events,
        vec![LedgerEvent::Staked { account: alice, amount: 980 * COIN }]
    );
    assert_eq!(bed.ledger.total_stake_of(&alice), 980 * COIN);
    bed.assert_sound();

    bed.clock.advance(30 * DAY);
    bed.ledger.withdraw(&alice, 980 * COIN).unwrap();
    assert_eq!(bed.ledger.total_staked(), 0);
    bed.assert_sound();
}

#[test]
fn failed_payout_reverts_whole_withdrawal() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let bob = bed.enroll(acct("bob"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 1000 * COIN).unwrap();
    bed.clock.advance(181 * DAY);

    let state = bed.ledger.state().clone();
    bed.asset.set_failure(Some("transfers suspended"));
    let err = bed.ledger.withdraw(&alice, 1000 * COIN).unwrap_err();
    assert_eq!(err, LedgerError::Asset(AssetError::Rejected("transfers suspended".into())));
    assert_eq!(bed.ledger.state(), &state);
    assert_eq!(bed.ledger.claim(&bob).unwrap_err(), err);
    assert_eq!(bed.ledger.state(), &state);

    bed.asset.set_failure(None);
    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();
    bed.assert_sound();
}

#[test]
fn unfunded_reserve_blocks_claim_but_not_exit() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.clock.advance(181 * DAY);

    let err = bed.ledger.claim(&alice).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientReserve { have: 0, .. }));
    assert_eq!(bed.ledger.position(&alice).accrued_reward, 0);

    bed.ledger.withdraw(&alice, 1000 * COIN).unwrap();
    assert_eq!(bed.balance(&alice), 1000 * COIN);
    let pending = bed.ledger.position(&alice).accrued_reward;
    assert!(pending > 0);
    let audit = bed.ledger.audit().unwrap();
    assert!(!audit.is_sound());
    assert_eq!(audit.shortfall(), pending);

    let owner = bed.owner;
    bed.ledger.deposit_rewards(&owner, 10 * COIN).unwrap();
    bed.assert_sound();
    bed.ledger.claim(&alice).unwrap();
    assert!(bed.balance(&alice) > 1000 * COIN);
    bed.assert_sound();
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn rescue_returns_stray_tokens_but_never_stake() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let owner = bed.owner;
    let stray = MemoryAsset::new(acct("stray"));
    stray.mint(&bed.custodian, 75 * COIN).unwrap();

    let events = bed.ledger.rescue_funds(&owner, &stray, 75 * COIN).unwrap();
    assert_eq!(
        events,
        vec![LedgerEvent::FundsRescued { token: acct("stray"), amount: 75 * COIN }]
    );
    assert_eq!(stray.balance_of(&owner), 75 * COIN);

    let staking: &MemoryAsset = &bed.asset.clone();
    assert_eq!(
        bed.ledger.rescue_funds(&owner, staking, COIN),
        Err(LedgerError::CannotRescueStakingToken)
    );
    let alice = bed.enroll(acct("alice"), COIN);
    assert_eq!(
        bed.ledger.rescue_funds(&alice, &stray, COIN),
        Err(LedgerError::NotOwner)
    );
}

#[test]
fn ownership_moves_in_two_steps() {
    let mut bed = TestBed::new(LedgerConfig::semi_annual());
    let owner = bed.owner;
    let heir = acct("heir");

    assert_eq!(
        bed.ledger.accept_ownership(&heir),
        Err(LedgerError::NoPendingOwnership)
    );
    assert_eq!(
        bed.ledger.transfer_ownership(&owner, AccountId::ZERO).unwrap_err().to_string(),
        "Ownable: new owner is the zero address"
    );
    assert_eq!(
        bed.ledger.transfer_ownership(&owner, heir).unwrap(),
        vec![LedgerEvent::OwnershipTransferStarted { from: owner, to: heir }]
    );
    // still the old owner until accepted
    bed.ledger.pause(&owner).unwrap();
    bed.ledger.accept_ownership(&heir).unwrap();
    assert_eq!(bed.ledger.owner(), heir);
    assert_eq!(bed.ledger.unpause(&owner), Err(LedgerError::NotOwner));
    bed.ledger.unpause(&heir).unwrap();
}

#[test]
fn operator_exit_pays_the_account() {
    let mut bed = TestBed::funded(LedgerConfig::monthly());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let keeper = acct("keeper");
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    assert_eq!(
        bed.ledger.set_operator(&alice, keeper, true).unwrap(),
        vec![LedgerEvent::OperatorSet { account: alice, operator: keeper, approved: true }]
    );
    bed.clock.advance(30 * DAY);

    bed.ledger.claim_for(&keeper, &alice).unwrap();
    bed.ledger.withdraw_for(&keeper, &alice, 1000 * COIN).unwrap();
    assert_eq!(bed.balance(&keeper), 0);
    assert_eq!(
        bed.balance(&alice),
        1000 * COIN + simple_yield(1000 * COIN, 20, 30 * DAY)
    );

    bed.ledger.set_operator(&alice, keeper, false).unwrap();
    assert_eq!(
        bed.ledger.claim_for(&keeper, &alice),
        Err(LedgerError::NotAuthorized)
    );
}

#[test]
fn snapshot_survives_restart() {
    let mut bed = TestBed::funded(LedgerConfig::semi_annual());
    let alice = bed.enroll(acct("alice"), 1000 * COIN);
    let bob = bed.enroll(acct("bob"), 500 * COIN);
    bed.ledger.stake(&alice, 1000 * COIN).unwrap();
    bed.ledger.stake(&bob, 500 * COIN).unwrap();
    bed.clock.advance(180 * DAY);
    bed.ledger.withdraw(&alice, 400 * COIN).unwrap();
    let owner = bed.owner;
    bed.ledger.freeze(&owner, bob).unwrap();

    let bytes = bed.ledger.snapshot().unwrap();
    let state = tidelock_ledger::LedgerState::decode(&bytes).unwrap();
    let mut restored = tidelock_ledger::Ledger::restore(
        *bed.ledger.config(),
        bed.asset.clone(),
        bed.custodian,
        state,
        bed.clock.source(),
    )
    .unwrap();

    assert_eq!(restored.state(), bed.ledger.state());
    assert!(restored.is_frozen(&bob));
    bed.clock.advance(DAY);
    assert_eq!(
        restored.stake_info(&bob).unwrap(),
        bed.ledger.stake_info(&bob).unwrap()
    );
    restored.withdraw(&bob, 500 * COIN).unwrap();
}
