// Checkpoint Store and account table
//
// Everything a ledger persists goes through `LedgerStore`: the account table,
// the sparse checkpoint table and the explicit clock counter. Writes are
// staged as `StoreOp`s and committed with a single `apply`, which backends
// must make all-or-nothing.

use alloy_primitives::U256;
use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::key::IntervalKey;
use crate::types::{AccountId, AccountState, Epoch};

pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// One staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    PutAccount(AccountId, AccountState),
    PutCheckpoint(IntervalKey, U256),
    DeleteCheckpoint(IntervalKey),
    PutEpoch(Epoch),
}

/// Persistence backend for one ledger instance
pub trait LedgerStore {
    /// Account state, `None` for an account never written
    fn account(&self, account: &AccountId) -> StoreResult<Option<AccountState>>;

    /// Checkpoint value, `None` when absent or reclaimed
    fn checkpoint(&self, key: &IntervalKey) -> StoreResult<Option<U256>>;

    /// Persisted explicit clock counter
    fn epoch(&self) -> StoreResult<Option<Epoch>>;

    /// Commit a batch atomically, in order
    fn apply(&mut self, ops: Vec<StoreOp>) -> StoreResult<()>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<AccountId, AccountState>,
    checkpoints: BTreeMap<IntervalKey, U256>,
    epoch: Option<Epoch>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoint records currently held
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// All records of one account, ordered by interval
    pub fn checkpoints_of(&self, account: &AccountId) -> Vec<(IntervalKey, U256)> {
        self.checkpoints
            .iter()
            .filter(|(key, _)| key.account == *account)
            .map(|(key, value)| (*key, *value))
            .collect()
    }
}

impl LedgerStore for MemoryStore {
    fn account(&self, account: &AccountId) -> StoreResult<Option<AccountState>> {
        Ok(self.accounts.get(account).copied())
    }

    fn checkpoint(&self, key: &IntervalKey) -> StoreResult<Option<U256>> {
        Ok(self.checkpoints.get(key).copied())
    }

    fn epoch(&self) -> StoreResult<Option<Epoch>> {
        Ok(self.epoch)
    }

    fn apply(&mut self, ops: Vec<StoreOp>) -> StoreResult<()> {
        for op in ops {
            match op {
                StoreOp::PutAccount(account, state) => {
                    self.accounts.insert(account, state);
                }
                StoreOp::PutCheckpoint(key, value) => {
                    self.checkpoints.insert(key, value);
                }
                StoreOp::DeleteCheckpoint(key) => {
                    self.checkpoints.remove(&key);
                }
                StoreOp::PutEpoch(epoch) => {
                    self.epoch = Some(epoch);
                }
            }
        }
        Ok(())
    }
}
