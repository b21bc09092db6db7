// Change log
//
// The ledger emits one `ValueChanged` per mutation leg and one
// `BoundaryAdvanced` per explicit advance. `KeyReconstructor` is the off-ledger
// counterpart: it replays those events and rebuilds every interval key the
// ledger materialized, without reading any ledger state.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::key::IntervalKey;
use crate::types::{AccountId, Epoch};

/// Event emitted by a ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// An account's live value changed while the clock read `epoch`
    ValueChanged {
        account: AccountId,
        old_value: U256,
        new_value: U256,
        epoch: Epoch,
    },
    /// The explicit clock moved to `epoch`
    BoundaryAdvanced { epoch: Epoch },
    /// A historical record was materialized
    CheckpointWritten { key: IntervalKey, value: U256 },
    /// A historical record was deleted
    CheckpointReclaimed { key: IntervalKey },
}

/// Rebuilds interval keys from a change log
#[derive(Debug, Default, Clone)]
pub struct KeyReconstructor {
    pointers: HashMap<AccountId, Epoch>,
    keys: BTreeMap<AccountId, Vec<IntervalKey>>,
    last_boundary: Epoch,
}

impl KeyReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; returns the key it materialized, if any
    pub fn observe(&mut self, event: &LedgerEvent) -> Option<IntervalKey> {
        match event {
            LedgerEvent::ValueChanged { account, epoch, .. } => {
                self.on_value_changed(*account, *epoch)
            }
            LedgerEvent::BoundaryAdvanced { epoch } => {
                self.last_boundary = self.last_boundary.max(*epoch);
                None
            }
            LedgerEvent::CheckpointReclaimed { key } => {
                if let Some(keys) = self.keys.get_mut(&key.account) {
                    keys.retain(|k| k != key);
                }
                None
            }
            LedgerEvent::CheckpointWritten { .. } => None,
        }
    }

    /// Feed a batch of events in log order
    pub fn observe_all<'a, I>(&mut self, events: I) -> Vec<IntervalKey>
    where
        I: IntoIterator<Item = &'a LedgerEvent>,
    {
        events
            .into_iter()
            .filter_map(|event| self.observe(event))
            .collect()
    }

    /// Keys rebuilt for `account`, oldest first
    pub fn keys_for(&self, account: &AccountId) -> &[IntervalKey] {
        self.keys.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The rebuilt key whose interval contains `epoch`
    pub fn key_covering(&self, account: &AccountId, epoch: Epoch) -> Option<IntervalKey> {
        self.keys_for(account)
            .iter()
            .find(|key| key.contains(epoch))
            .copied()
    }

    /// Highest boundary seen in the log
    pub fn last_boundary(&self) -> Epoch {
        self.last_boundary
    }

    fn on_value_changed(&mut self, account: AccountId, epoch: Epoch) -> Option<IntervalKey> {
        let next = epoch.saturating_add(1);
        let previous = self.pointers.insert(account, next);

        match previous {
            // First change seen: the pointer is known from here on
            None => None,
            // Same epoch as the last change: nothing materialized
            Some(from) if from > epoch => {
                self.pointers.insert(account, from);
                None
            }
            Some(from) => {
                let key = IntervalKey {
                    account,
                    from,
                    to: next,
                };
                self.keys.entry(account).or_default().push(key);
                Some(key)
            }
        }
    }
}
