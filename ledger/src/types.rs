use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::key::IntervalKey;

/// Account identifier
pub type AccountId = Address;

/// Checkpoint boundary identifier
pub type Epoch = u64;

/// Signed change applied to an account's live value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delta {
    Increase(U256),
    Decrease(U256),
}

impl Delta {
    pub fn magnitude(&self) -> U256 {
        match self {
            Delta::Increase(amount) | Delta::Decrease(amount) => *amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude().is_zero()
    }
}

/// Live per-account state for one tracked quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Value held right now
    pub current_value: U256,
    /// First epoch from which `current_value` is known to be correct
    pub recorded_epoch: Epoch,
}

impl AccountState {
    /// True until the account has been mutated for the first time
    pub fn is_untouched(&self) -> bool {
        self.recorded_epoch == 0
    }

    /// Whether `current_value` also answers queries for `epoch`
    pub fn covers(&self, epoch: Epoch) -> bool {
        epoch >= self.recorded_epoch
    }
}

/// Historical value held throughout `[key.from, key.to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub key: IntervalKey,
    pub value: U256,
}
