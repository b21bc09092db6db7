// Account Tracker
//
// Checkpoint-on-write: before an account's value changes, the tracker decides
// whether a boundary was crossed since the account's pointer was last moved.
// If so, the value held over the whole elapsed interval is flushed into the
// checkpoint table and the pointer jumps to `epoch + 1`. Only the first
// mutation after a boundary pays for a write.
//
// All writes are staged on top of the store and handed back as one batch, so
// an operation that fails half way leaves nothing behind.

use alloy_primitives::U256;
use std::collections::{BTreeMap, HashMap};

use crate::config::{LedgerConfig, WritePolicy};
use crate::error::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::key::{IntervalKey, KeyLayout};
use crate::store::{LedgerStore, StoreOp};
use crate::types::{AccountId, AccountState, CheckpointRecord, Delta, Epoch};

/// Staged view of one ledger operation
pub struct AccountTracker<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    layout: KeyLayout,
    policy: WritePolicy,
    epoch: Epoch,
    accounts: BTreeMap<AccountId, AccountState>,
    checkpoints: HashMap<IntervalKey, Option<U256>>,
    ops: Vec<StoreOp>,
    events: Vec<LedgerEvent>,
}

impl<'a, S: LedgerStore + ?Sized> AccountTracker<'a, S> {
    /// Start staging an operation observed at clock value `epoch`
    pub fn new(store: &'a S, config: &LedgerConfig, epoch: Epoch) -> Self {
        Self {
            store,
            layout: config.key_layout,
            policy: config.write_policy,
            epoch,
            accounts: BTreeMap::new(),
            checkpoints: HashMap::new(),
            ops: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Account state including staged changes
    pub fn state(&self, account: &AccountId) -> Result<AccountState> {
        if let Some(state) = self.accounts.get(account) {
            return Ok(*state);
        }
        Ok(self.store.account(account)?.unwrap_or_default())
    }

    /// Checkpoint value including staged writes and deletes
    pub fn checkpoint(&self, key: &IntervalKey) -> Result<Option<U256>> {
        if let Some(staged) = self.checkpoints.get(key) {
            return Ok(*staged);
        }
        Ok(self.store.checkpoint(key)?)
    }

    /// Live value of `account`
    pub fn value_now(&self, account: &AccountId) -> Result<U256> {
        Ok(self.state(account)?.current_value)
    }

    /// Flush a checkpoint for `account` if a boundary was crossed
    ///
    /// Returns the record written, if any. An account touched for the first
    /// time only has its pointer moved: its implied history is all zero.
    pub fn prepare_mutation(&mut self, account: AccountId) -> Result<Option<CheckpointRecord>> {
        let mut state = self.state(&account)?;
        if state.recorded_epoch > self.epoch {
            return Ok(None);
        }

        let next = self
            .epoch
            .checked_add(1)
            .ok_or(LedgerError::Unsupported("epoch counter exhausted"))?;
        if next > self.layout.max_epoch() {
            return Err(LedgerError::InvalidRange(format!(
                "epoch {} exceeds the {}-byte key layout (max {})",
                next,
                self.layout.epoch_bytes,
                self.layout.max_epoch()
            )));
        }

        let record = if state.is_untouched() {
            None
        } else {
            let key = IntervalKey {
                account,
                from: state.recorded_epoch,
                to: next,
            };
            self.write_checkpoint(key, state.current_value)?;
            Some(CheckpointRecord {
                key,
                value: state.current_value,
            })
        };

        state.recorded_epoch = next;
        self.accounts.insert(account, state);
        Ok(record)
    }

    /// Apply `delta` to `account`, checkpointing first when needed
    pub fn apply(&mut self, account: AccountId, delta: Delta) -> Result<U256> {
        let old_value = self.value_now(&account)?;
        let new_value = match delta {
            Delta::Increase(amount) => old_value
                .checked_add(amount)
                .ok_or(LedgerError::ValueOverflow(account))?,
            Delta::Decrease(amount) => {
                old_value
                    .checked_sub(amount)
                    .ok_or(LedgerError::InsufficientValue {
                        account,
                        available: old_value,
                        requested: amount,
                    })?
            }
        };

        self.prepare_mutation(account)?;

        let mut state = self.state(&account)?;
        state.current_value = new_value;
        self.accounts.insert(account, state);
        self.events.push(LedgerEvent::ValueChanged {
            account,
            old_value,
            new_value,
            epoch: self.epoch,
        });
        Ok(new_value)
    }

    /// Forget a checkpoint record; returns whether one was present
    pub fn reclaim(&mut self, key: IntervalKey) -> Result<bool> {
        self.layout.check(&key)?;
        let existed = self.checkpoint(&key)?.is_some();

        self.checkpoints.insert(key, None);
        self.ops.push(StoreOp::DeleteCheckpoint(key));
        if existed {
            self.events.push(LedgerEvent::CheckpointReclaimed { key });
        }
        Ok(existed)
    }

    /// Staged writes and the events they produce
    pub fn into_parts(self) -> (Vec<StoreOp>, Vec<LedgerEvent>) {
        let mut ops = self.ops;
        ops.extend(
            self.accounts
                .into_iter()
                .map(|(account, state)| StoreOp::PutAccount(account, state)),
        );
        (ops, self.events)
    }

    fn write_checkpoint(&mut self, key: IntervalKey, value: U256) -> Result<()> {
        self.layout.check(&key)?;
        if self.policy == WritePolicy::Reject && self.checkpoint(&key)?.is_some() {
            return Err(LedgerError::DuplicateCheckpoint(key));
        }

        self.checkpoints.insert(key, Some(value));
        self.ops.push(StoreOp::PutCheckpoint(key, value));
        self.events.push(LedgerEvent::CheckpointWritten { key, value });
        Ok(())
    }
}
