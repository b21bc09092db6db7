// Push Notifier
//
// Delivers a resolved (live or historical) value to a third party through its
// callback, optionally moving an auxiliary asset to it in the same step. The
// ledger itself is only borrowed immutably while the callback runs, so a
// receiver can read it but cannot re-enter a mutation.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{LedgerError, ReceiverError, Result};
use crate::key::IntervalKey;
use crate::types::{AccountId, Epoch};

sol! {
    /// Callback interface of push receivers living behind an ABI boundary
    interface IPushReceiver {
        function onPush(uint256 snapshotId, address sender, uint256 balance, bytes data) external;
        function onPushWithValue(uint256 snapshotId, address sender, uint256 balance, bytes data) external payable;
    }
}

/// Value delivered to a receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub target_epoch: Epoch,
    pub sender: AccountId,
    pub value: U256,
    pub data: Bytes,
    /// Auxiliary asset forwarded with the push
    pub transfer: Option<U256>,
}

impl PushPayload {
    /// ABI calldata for the matching `IPushReceiver` callback
    pub fn to_calldata(&self) -> Bytes {
        let snapshot_id = U256::from(self.target_epoch);
        let encoded = match self.transfer {
            None => IPushReceiver::onPushCall {
                snapshotId: snapshot_id,
                sender: self.sender,
                balance: self.value,
                data: self.data.clone(),
            }
            .abi_encode(),
            Some(_) => IPushReceiver::onPushWithValueCall {
                snapshotId: snapshot_id,
                sender: self.sender,
                balance: self.value,
                data: self.data.clone(),
            }
            .abi_encode(),
        };
        Bytes::from(encoded)
    }
}

/// Read-only access a receiver gets to the pushing ledger
pub trait LedgerView {
    fn current_epoch(&self) -> Epoch;
    fn recorded_epoch(&self, account: &AccountId) -> Result<Epoch>;
    fn value_of(&self, account: &AccountId) -> Result<U256>;
    fn value_at(&self, key: &IntervalKey) -> Result<U256>;
}

/// Third-party push target
pub trait PushReceiver {
    /// Account credited with forwarded value
    fn address(&self) -> Address;

    fn on_push(
        &mut self,
        ledger: &dyn LedgerView,
        payload: &PushPayload,
    ) -> std::result::Result<(), ReceiverError>;

    /// Value-accepting callback; the forwarded amount is already credited
    fn on_push_with_value(
        &mut self,
        _ledger: &dyn LedgerView,
        _payload: &PushPayload,
    ) -> std::result::Result<(), ReceiverError> {
        Err(ReceiverError::new("receiver does not accept value"))
    }
}

/// Journal position returned by `ValueBank::checkpoint`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankCheckpoint(usize);

/// Auxiliary asset moved alongside value-forwarding pushes
pub trait ValueBank {
    fn balance_of(&self, who: &Address) -> U256;

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()>;

    /// Start a revertible section
    fn checkpoint(&mut self) -> BankCheckpoint;

    /// Keep everything since `checkpoint`
    fn commit(&mut self, checkpoint: BankCheckpoint);

    /// Undo everything since `checkpoint`
    fn revert(&mut self, checkpoint: BankCheckpoint);
}

/// In-memory native asset with a journal for reverts
#[derive(Debug, Clone, Default)]
pub struct NativeBank {
    balances: HashMap<Address, U256>,
    journal: Vec<(Address, U256)>,
    depth: usize,
}

impl NativeBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, to: Address, amount: U256) {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn set_balance(&mut self, who: Address, amount: U256) {
        if self.depth > 0 {
            self.journal.push((who, self.balance_of(&who)));
        }
        self.balances.insert(who, amount);
    }
}

impl ValueBank for NativeBank {
    fn balance_of(&self, who: &Address) -> U256 {
        self.balances.get(who).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientValue {
                account: from,
                available,
                requested: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::ValueOverflow(to))?;

        self.set_balance(from, remaining);
        self.set_balance(to, credited);
        Ok(())
    }

    fn checkpoint(&mut self) -> BankCheckpoint {
        self.depth += 1;
        BankCheckpoint(self.journal.len())
    }

    fn commit(&mut self, checkpoint: BankCheckpoint) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        } else {
            debug_assert!(self.journal.len() >= checkpoint.0);
        }
    }

    fn revert(&mut self, checkpoint: BankCheckpoint) {
        while self.journal.len() > checkpoint.0 {
            if let Some((who, previous)) = self.journal.pop() {
                self.balances.insert(who, previous);
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Hands resolved values to receivers
pub struct PushNotifier;

impl PushNotifier {
    /// Invoke `on_push`; the ledger must already have resolved `payload`
    pub fn deliver<R>(
        ledger: &dyn LedgerView,
        receiver: &mut R,
        payload: &PushPayload,
    ) -> Result<()>
    where
        R: PushReceiver + ?Sized,
    {
        let target = receiver.address();
        receiver.on_push(ledger, payload).map_err(|e| {
            warn!("Receiver {} rejected push from {}: {}", target, payload.sender, e);
            LedgerError::ReceiverCallbackFailure {
                receiver: target,
                reason: e.to_string(),
            }
        })?;

        debug!(
            "Pushed value {} at epoch {} from {} to {}",
            payload.value, payload.target_epoch, payload.sender, target
        );
        Ok(())
    }

    /// Move `payload.transfer` to the receiver, then invoke
    /// `on_push_with_value`; a failing callback undoes the transfer
    pub fn deliver_with_value<R, B>(
        ledger: &dyn LedgerView,
        receiver: &mut R,
        payload: &PushPayload,
        bank: &mut B,
    ) -> Result<()>
    where
        R: PushReceiver + ?Sized,
        B: ValueBank + ?Sized,
    {
        let target = receiver.address();
        let amount = payload.transfer.unwrap_or_default();

        let checkpoint = bank.checkpoint();
        if let Err(e) = bank.transfer(payload.sender, target, amount) {
            bank.revert(checkpoint);
            return Err(e);
        }

        match receiver.on_push_with_value(ledger, payload) {
            Ok(()) => {
                bank.commit(checkpoint);
                debug!(
                    "Pushed value {} at epoch {} from {} to {} with {} attached",
                    payload.value, payload.target_epoch, payload.sender, target, amount
                );
                Ok(())
            }
            Err(e) => {
                bank.revert(checkpoint);
                warn!("Receiver {} rejected push from {}: {}", target, payload.sender, e);
                Err(LedgerError::ReceiverCallbackFailure {
                    receiver: target,
                    reason: e.to_string(),
                })
            }
        }
    }
}
