// Ledger Facade
//
// One instance per tracked quantity. Owns the clock, the store and the change
// log; every mutation is staged through an `AccountTracker` and committed as a
// single batch, so a failing operation changes nothing.

use alloy_primitives::{Bytes, U256};
use tracing::{debug, info, warn};

use crate::clock::{CheckpointClock, ExplicitClock, SharedTicks, TickClock, TickSource};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::key::{IntervalKey, KeyLayout};
use crate::push::{LedgerView, PushNotifier, PushPayload, PushReceiver, ValueBank};
use crate::store::{LedgerStore, MemoryStore, StoreOp};
use crate::tracker::AccountTracker;
use crate::types::{AccountId, AccountState, Delta, Epoch};

/// Balance ledger with boundaries opened by `advance()`
pub type BalanceLedger<S = MemoryStore> = Ledger<ExplicitClock, S>;

/// Voting power ledger where every external tick is a boundary
pub type VotingPowerLedger<T = SharedTicks, S = MemoryStore> = Ledger<TickClock<T>, S>;

/// Checkpointed quantity ledger
pub struct Ledger<C, S> {
    config: LedgerConfig,
    clock: C,
    store: S,
    events: Vec<LedgerEvent>,
}

impl<S: LedgerStore> Ledger<ExplicitClock, S> {
    /// Ledger driven by an explicit counter, resumed from `store` if persisted
    pub fn with_explicit_clock(config: LedgerConfig, store: S) -> Result<Self> {
        Self::new(config, ExplicitClock::new(), store)
    }
}

impl<T: TickSource, S: LedgerStore> Ledger<TickClock<T>, S> {
    /// Ledger whose epoch follows an external tick
    pub fn with_ticks(config: LedgerConfig, ticks: T, store: S) -> Result<Self> {
        Self::new(config, TickClock::new(ticks), store)
    }
}

impl<C: CheckpointClock, S: LedgerStore> Ledger<C, S> {
    pub fn new(config: LedgerConfig, mut clock: C, store: S) -> Result<Self> {
        config.validate()?;
        if clock.is_explicit() {
            if let Some(epoch) = store.epoch()? {
                clock.resume(epoch);
            }
        }

        info!(
            "Opened {} ledger at epoch {}",
            config.name,
            clock.current_epoch()
        );

        Ok(Self {
            config,
            clock,
            store,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn key_layout(&self) -> &KeyLayout {
        &self.config.key_layout
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new boundary (explicit clocks only)
    ///
    /// Creating a boundary writes no checkpoints; they are materialized
    /// lazily by the next mutation of each account.
    pub fn advance(&mut self) -> Result<Epoch> {
        if !self.clock.is_explicit() {
            return self.clock.advance();
        }

        let next = self
            .clock
            .current_epoch()
            .checked_add(1)
            .ok_or(LedgerError::Unsupported("epoch counter exhausted"))?;
        self.store.apply(vec![StoreOp::PutEpoch(next)])?;
        let epoch = self.clock.advance()?;
        debug_assert_eq!(epoch, next);

        info!("{} ledger advanced to epoch {}", self.config.name, epoch);
        self.events.push(LedgerEvent::BoundaryAdvanced { epoch });
        Ok(epoch)
    }

    pub fn current_epoch(&self) -> Epoch {
        self.clock.current_epoch()
    }

    pub fn account_state(&self, account: &AccountId) -> Result<AccountState> {
        Ok(self.store.account(account)?.unwrap_or_default())
    }

    pub fn recorded_epoch(&self, account: &AccountId) -> Result<Epoch> {
        Ok(self.account_state(account)?.recorded_epoch)
    }

    /// Live value; valid for every epoch from `recorded_epoch` on
    pub fn value_of(&self, account: &AccountId) -> Result<U256> {
        Ok(self.account_state(account)?.current_value)
    }

    /// Historical value addressed by `key`
    pub fn value_at(&self, key: &IntervalKey) -> Result<U256> {
        self.config.key_layout.check(key)?;
        self.store
            .checkpoint(key)?
            .ok_or(LedgerError::CheckpointMiss(*key))
    }

    /// Historical value addressed by a canonically encoded key
    pub fn value_at_encoded(&self, key: &[u8]) -> Result<U256> {
        let key = self.config.key_layout.decode(key)?;
        self.value_at(&key)
    }

    /// Historical value addressed by a hex key (account followed by epochs)
    pub fn value_at_hex(&self, key: &str) -> Result<U256> {
        let key = self.config.key_layout.decode_hex(key)?;
        self.value_at(&key)
    }

    /// Apply `delta` to `account` and return the new value
    pub fn mutate(&mut self, account: AccountId, delta: Delta) -> Result<U256> {
        self.commit(|tracker| tracker.apply(account, delta))
    }

    /// Mutate, then delete `stale_key` to recover its storage
    ///
    /// The stale key must belong to `account`. Reclaiming is irreversible.
    pub fn mutate_and_reclaim(
        &mut self,
        account: AccountId,
        delta: Delta,
        stale_key: IntervalKey,
    ) -> Result<U256> {
        ensure_owner(account, &stale_key)?;
        self.commit(|tracker| {
            let value = tracker.apply(account, delta)?;
            tracker.reclaim(stale_key)?;
            Ok(value)
        })
    }

    /// Apply several legs atomically, in order
    pub fn mutate_batch(&mut self, legs: &[(AccountId, Delta)]) -> Result<Vec<U256>> {
        self.commit(|tracker| {
            legs.iter()
                .map(|(account, delta)| tracker.apply(*account, *delta))
                .collect()
        })
    }

    /// Events emitted so far
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take the change log accumulated since the last drain
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Push the live value of `sender` for `target_epoch`
    pub fn push_at<R>(
        &self,
        sender: AccountId,
        target_epoch: Epoch,
        receiver: &mut R,
        data: Bytes,
    ) -> Result<PushPayload>
    where
        R: PushReceiver + ?Sized,
    {
        let value = self.resolve_live(&sender, target_epoch)?;
        let payload = PushPayload {
            target_epoch,
            sender,
            value,
            data,
            transfer: None,
        };
        PushNotifier::deliver(self, receiver, &payload)?;
        Ok(payload)
    }

    /// Live push forwarding `amount` of the auxiliary asset
    pub fn push_at_with_value<R, B>(
        &self,
        sender: AccountId,
        target_epoch: Epoch,
        receiver: &mut R,
        data: Bytes,
        bank: &mut B,
        amount: U256,
    ) -> Result<PushPayload>
    where
        R: PushReceiver + ?Sized,
        B: ValueBank + ?Sized,
    {
        let value = self.resolve_live(&sender, target_epoch)?;
        let payload = PushPayload {
            target_epoch,
            sender,
            value,
            data,
            transfer: Some(amount),
        };
        PushNotifier::deliver_with_value(self, receiver, &payload, bank)?;
        Ok(payload)
    }

    /// Push the historical value of `sender` stored under `key`
    pub fn push_at_key<R>(
        &self,
        sender: AccountId,
        target_epoch: Epoch,
        key: &IntervalKey,
        receiver: &mut R,
        data: Bytes,
    ) -> Result<PushPayload>
    where
        R: PushReceiver + ?Sized,
    {
        let value = self.resolve_historical(&sender, target_epoch, key)?;
        let payload = PushPayload {
            target_epoch,
            sender,
            value,
            data,
            transfer: None,
        };
        PushNotifier::deliver(self, receiver, &payload)?;
        Ok(payload)
    }

    /// Historical push forwarding `amount` of the auxiliary asset
    #[allow(clippy::too_many_arguments)]
    pub fn push_at_key_with_value<R, B>(
        &self,
        sender: AccountId,
        target_epoch: Epoch,
        key: &IntervalKey,
        receiver: &mut R,
        data: Bytes,
        bank: &mut B,
        amount: U256,
    ) -> Result<PushPayload>
    where
        R: PushReceiver + ?Sized,
        B: ValueBank + ?Sized,
    {
        let value = self.resolve_historical(&sender, target_epoch, key)?;
        let payload = PushPayload {
            target_epoch,
            sender,
            value,
            data,
            transfer: Some(amount),
        };
        PushNotifier::deliver_with_value(self, receiver, &payload, bank)?;
        Ok(payload)
    }

    /// Stage an operation on a tracker and commit it as one batch
    pub(crate) fn commit<T>(
        &mut self,
        f: impl FnOnce(&mut AccountTracker<'_, S>) -> Result<T>,
    ) -> Result<T> {
        let epoch = self.clock.current_epoch();
        let (out, ops, events) = {
            let mut tracker = AccountTracker::new(&self.store, &self.config, epoch);
            let out = f(&mut tracker)?;
            let (ops, events) = tracker.into_parts();
            (out, ops, events)
        };

        self.store.apply(ops)?;

        for event in &events {
            match event {
                LedgerEvent::CheckpointWritten { key, value } => {
                    debug!("Recorded checkpoint {} = {}", key, value);
                }
                LedgerEvent::CheckpointReclaimed { key } => {
                    debug!("Reclaimed checkpoint {}", key);
                }
                _ => {}
            }
        }
        self.events.extend(events);
        Ok(out)
    }

    fn resolve_live(&self, sender: &AccountId, target_epoch: Epoch) -> Result<U256> {
        let state = self.account_state(sender)?;
        let current = self.current_epoch();
        if !state.covers(target_epoch) || target_epoch > current {
            warn!(
                "Rejected live push from {} for epoch {} (live since {}, now {})",
                sender, target_epoch, state.recorded_epoch, current
            );
            return Err(LedgerError::StaleTarget {
                target: target_epoch,
                from: state.recorded_epoch,
                to: current.saturating_add(1),
            });
        }
        Ok(state.current_value)
    }

    fn resolve_historical(
        &self,
        sender: &AccountId,
        target_epoch: Epoch,
        key: &IntervalKey,
    ) -> Result<U256> {
        ensure_owner(*sender, key)?;
        self.config.key_layout.check(key)?;
        if !key.contains(target_epoch) {
            warn!(
                "Rejected historical push from {} for epoch {} with key {}",
                sender, target_epoch, key
            );
            return Err(LedgerError::StaleTarget {
                target: target_epoch,
                from: key.from,
                to: key.to,
            });
        }
        self.value_at(key)
    }
}

impl<C: CheckpointClock, S: LedgerStore> LedgerView for Ledger<C, S> {
    fn current_epoch(&self) -> Epoch {
        Ledger::current_epoch(self)
    }

    fn recorded_epoch(&self, account: &AccountId) -> Result<Epoch> {
        Ledger::recorded_epoch(self, account)
    }

    fn value_of(&self, account: &AccountId) -> Result<U256> {
        Ledger::value_of(self, account)
    }

    fn value_at(&self, key: &IntervalKey) -> Result<U256> {
        Ledger::value_at(self, key)
    }
}

pub(crate) fn ensure_owner(account: AccountId, key: &IntervalKey) -> Result<()> {
    if key.account != account {
        return Err(LedgerError::InvalidRange(format!(
            "key {} does not belong to {}",
            key, account
        )));
    }
    Ok(())
}
