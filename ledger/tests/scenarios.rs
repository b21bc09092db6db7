// Ledger scenarios
//
// End-to-end walks through the balance (explicit clock) and voting power
// (block tick) ledgers, checking recorded epochs and historical lookups.

use alloy_primitives::{Address, U256};
use ledger::{
    BalanceLedger, Delta, IntervalKey, KeyReconstructor, Ledger, LedgerConfig, LedgerError,
    MemoryStore, SharedTicks, VotingPowerLedger,
};
use testutil::{account, init_tracing};

fn owner() -> Address {
    account(3)
}

fn alice() -> Address {
    account(0)
}

fn units(value: u64) -> U256 {
    U256::from(value)
}

fn balances() -> BalanceLedger {
    init_tracing();
    Ledger::with_explicit_clock(LedgerConfig::balance(), MemoryStore::new()).unwrap()
}

/// `account` followed by the two 6-byte epochs, as hex
fn hex_key(account: Address, from: u64, to: u64) -> String {
    format!("{}{:012x}{:012x}", account, from, to)
}

#[test]
fn test_sender_history() {
    let mut ledger = balances();
    assert_eq!(ledger.current_epoch(), 0);

    ledger.mint(owner(), units(1_000_000)).unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(900_000));
    assert_eq!(ledger.recorded_epoch(&owner()).unwrap(), 1);

    assert_eq!(ledger.advance().unwrap(), 1);
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(900_000));
    assert_eq!(ledger.recorded_epoch(&owner()).unwrap(), 1);

    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(800_000));
    assert_eq!(
        ledger.value_at_hex(&hex_key(owner(), 1, 2)).unwrap(),
        units(900_000)
    );
    assert_eq!(ledger.recorded_epoch(&owner()).unwrap(), 2);

    ledger.advance().unwrap();
    assert_eq!(ledger.advance().unwrap(), 3);
    assert_eq!(ledger.recorded_epoch(&owner()).unwrap(), 2);

    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(700_000));
    assert_eq!(
        ledger.value_at_hex(&hex_key(owner(), 2, 4)).unwrap(),
        units(800_000)
    );
    assert_eq!(ledger.recorded_epoch(&owner()).unwrap(), 4);
}

#[test]
fn test_receiver_history() {
    let mut ledger = balances();

    ledger.mint(owner(), units(1_000_000)).unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&alice()).unwrap(), units(100_000));
    assert_eq!(ledger.recorded_epoch(&alice()).unwrap(), 1);

    ledger.advance().unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&alice()).unwrap(), units(200_000));
    assert_eq!(
        ledger.value_at_hex(&hex_key(alice(), 1, 2)).unwrap(),
        units(100_000)
    );

    ledger.advance().unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    assert_eq!(ledger.value_of(&alice()).unwrap(), units(300_000));
    assert_eq!(
        ledger.value_at_hex(&hex_key(alice(), 2, 4)).unwrap(),
        units(200_000)
    );
    assert_eq!(ledger.recorded_epoch(&alice()).unwrap(), 4);
}

#[test]
fn test_reclaim_in_transfer() {
    let mut ledger = balances();
    ledger.mint(owner(), units(1_000_000)).unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();

    let stale = ledger
        .key_layout()
        .decode_hex(&hex_key(owner(), 1, 2))
        .unwrap();
    ledger
        .transfer_and_reclaim(owner(), alice(), units(100_000), stale)
        .unwrap();

    assert!(matches!(
        ledger.value_at(&stale),
        Err(LedgerError::CheckpointMiss(_))
    ));
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(800_000));
}

#[test]
fn test_reclaim_during_mutation() {
    let mut ledger = balances();
    ledger.mint(owner(), units(50)).unwrap();
    ledger.advance().unwrap();
    ledger.mint(owner(), units(50)).unwrap();
    ledger.advance().unwrap();

    let stale = IntervalKey::new(owner(), 1, 2).unwrap();
    let value = ledger
        .mutate_and_reclaim(owner(), Delta::Decrease(units(30)), stale)
        .unwrap();
    assert_eq!(value, units(70));
    assert!(ledger.value_at(&stale).is_err());
    assert_eq!(
        ledger.value_at(&IntervalKey::new(owner(), 2, 3).unwrap()).unwrap(),
        units(100)
    );

    // Reclaiming an already deleted key is harmless
    ledger
        .mutate_and_reclaim(owner(), Delta::Increase(units(1)), stale)
        .unwrap();
    assert_eq!(ledger.value_of(&owner()).unwrap(), units(71));
}

#[test]
fn test_burn_history() {
    let mut ledger = balances();
    ledger.mint(owner(), units(1_000_000)).unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();
    ledger.burn(alice(), units(10_000)).unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), alice(), units(100_000)).unwrap();

    assert_eq!(
        ledger.value_at_hex(&hex_key(alice(), 1, 2)).unwrap(),
        units(90_000)
    );
}

#[test]
fn test_self_transfer_checkpoints_once() {
    let mut ledger = balances();
    ledger.mint(owner(), units(10)).unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), owner(), units(4)).unwrap();

    assert_eq!(ledger.value_of(&owner()).unwrap(), units(10));
    assert_eq!(ledger.store().checkpoints_of(&owner()).len(), 1);
}

#[test]
fn test_unmaterialized_key_misses() {
    let mut ledger = balances();
    ledger.mint(owner(), units(10)).unwrap();
    ledger.advance().unwrap();
    ledger.advance().unwrap();

    // Nothing was flushed yet: no mutation since the boundaries
    let key = IntervalKey::new(owner(), 1, 3).unwrap();
    assert!(matches!(
        ledger.value_at(&key),
        Err(LedgerError::CheckpointMiss(k)) if k == key
    ));

    // First touch never records its implied zero history
    let untouched = IntervalKey::new(owner(), 0, 1).unwrap();
    assert!(ledger.value_at(&untouched).is_err());
}

#[test]
fn test_malformed_keys_rejected() {
    let ledger = balances();
    assert!(matches!(
        ledger.value_at_hex("0x1234"),
        Err(LedgerError::InvalidRange(_))
    ));
    assert!(matches!(
        ledger.value_at_hex(&hex_key(owner(), 2, 2)),
        Err(LedgerError::InvalidRange(_))
    ));
    assert!(IntervalKey::new(owner(), 5, 4).is_err());
}

/// Runs `f` in the next block
fn in_block<T>(ticks: &SharedTicks, f: impl FnOnce() -> T) -> T {
    ticks.bump();
    f()
}

#[test]
fn test_voting_power_sender() {
    init_tracing();
    let first = 1_000;
    let ticks = SharedTicks::new(first);
    let mut votes: VotingPowerLedger =
        Ledger::with_ticks(LedgerConfig::voting_power(), ticks.clone(), MemoryStore::new())
            .unwrap();

    in_block(&ticks, || votes.mint(owner(), units(1_000_000))).unwrap();
    in_block(&ticks, || votes.transfer(owner(), alice(), units(100_000))).unwrap();
    assert_eq!(votes.value_of(&owner()).unwrap(), units(900_000));
    assert_eq!(votes.recorded_epoch(&owner()).unwrap(), first + 2);
    assert_eq!(votes.recorded_epoch(&owner()).unwrap(), votes.current_epoch() + 1);

    // Unrelated block
    ticks.bump();
    assert_eq!(votes.current_epoch() + 1, first + 3);
    assert_eq!(votes.recorded_epoch(&owner()).unwrap(), first + 2);

    in_block(&ticks, || votes.transfer(owner(), alice(), units(100_000))).unwrap();
    let key = IntervalKey::new(owner(), first + 2, first + 4).unwrap();
    assert_eq!(votes.value_at(&key).unwrap(), units(900_000));
    assert_eq!(votes.recorded_epoch(&owner()).unwrap(), first + 4);

    ticks.bump();
    ticks.bump();
    in_block(&ticks, || votes.transfer(owner(), alice(), units(100_000))).unwrap();
    let key = IntervalKey::new(owner(), first + 4, first + 7).unwrap();
    assert_eq!(votes.value_at(&key).unwrap(), units(800_000));
    assert_eq!(votes.value_of(&owner()).unwrap(), units(700_000));
    assert_eq!(votes.recorded_epoch(&owner()).unwrap(), first + 7);
}

#[test]
fn test_voting_power_reclaim_and_burn() {
    let first = 40;
    let ticks = SharedTicks::new(first);
    let mut votes: VotingPowerLedger =
        Ledger::with_ticks(LedgerConfig::voting_power(), ticks.clone(), MemoryStore::new())
            .unwrap();

    in_block(&ticks, || votes.mint(owner(), units(1_000_000))).unwrap();
    in_block(&ticks, || votes.transfer(owner(), alice(), units(100_000))).unwrap();
    in_block(&ticks, || votes.burn(alice(), units(10_000))).unwrap();
    in_block(&ticks, || votes.transfer(owner(), alice(), units(100_000))).unwrap();

    let alice_key = IntervalKey::new(alice(), first + 3, first + 4).unwrap();
    assert_eq!(votes.value_at(&alice_key).unwrap(), units(90_000));

    let stale = IntervalKey::new(owner(), first + 1, first + 2).unwrap();
    assert_eq!(votes.value_at(&stale).unwrap(), units(1_000_000));
    in_block(&ticks, || {
        votes.transfer_and_reclaim(owner(), alice(), units(100_000), stale)
    })
    .unwrap();
    assert!(votes.value_at(&stale).is_err());
}

#[test]
fn test_change_log_rebuilds_every_key() {
    let mut ledger = balances();
    let bob = account(1);

    ledger.advance().unwrap();
    ledger.mint(owner(), units(1_000)).unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), bob, units(10)).unwrap();
    ledger.transfer(owner(), bob, units(10)).unwrap();
    ledger.advance().unwrap();
    ledger.advance().unwrap();
    ledger.transfer(owner(), bob, units(10)).unwrap();
    ledger.advance().unwrap();

    let mut rebuild = KeyReconstructor::new();
    rebuild.observe_all(ledger.events());

    for who in [owner(), bob] {
        let stored: Vec<IntervalKey> = ledger
            .store()
            .checkpoints_of(&who)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(rebuild.keys_for(&who), stored.as_slice());
    }
    assert_eq!(rebuild.last_boundary(), ledger.current_epoch());

    let key = rebuild.key_covering(&owner(), 3).unwrap();
    assert_eq!(ledger.value_at(&key).unwrap(), units(980));
}
