/// Push receiver fixtures

use alloy_primitives::{Address, U256};
use ledger::{LedgerView, PushPayload, PushReceiver, ReceiverError};

/// Records every push it accepts
#[derive(Debug, Clone)]
pub struct RecordingReceiver {
    pub address: Address,
    pub received: Vec<PushPayload>,
    /// Sum of values forwarded through `on_push_with_value`
    pub forwarded: U256,
    /// Live value of the sender as the receiver saw it during the callback
    pub observed_live: Vec<U256>,
}

impl RecordingReceiver {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            received: Vec::new(),
            forwarded: U256::ZERO,
            observed_live: Vec::new(),
        }
    }

    pub fn last(&self) -> Option<&PushPayload> {
        self.received.last()
    }

    fn record(
        &mut self,
        ledger: &dyn LedgerView,
        payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        let live = ledger
            .value_of(&payload.sender)
            .map_err(|e| ReceiverError::new(e.to_string()))?;
        self.observed_live.push(live);
        self.received.push(payload.clone());
        Ok(())
    }
}

impl PushReceiver for RecordingReceiver {
    fn address(&self) -> Address {
        self.address
    }

    fn on_push(
        &mut self,
        ledger: &dyn LedgerView,
        payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        self.record(ledger, payload)
    }

    fn on_push_with_value(
        &mut self,
        ledger: &dyn LedgerView,
        payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        self.record(ledger, payload)?;
        self.forwarded = self
            .forwarded
            .saturating_add(payload.transfer.unwrap_or_default());
        Ok(())
    }
}

/// Fails every callback with a fixed reason
#[derive(Debug, Clone)]
pub struct RejectingReceiver {
    pub address: Address,
    pub reason: String,
    pub calls: usize,
}

impl RejectingReceiver {
    pub fn new(address: Address, reason: impl Into<String>) -> Self {
        Self {
            address,
            reason: reason.into(),
            calls: 0,
        }
    }
}

impl PushReceiver for RejectingReceiver {
    fn address(&self) -> Address {
        self.address
    }

    fn on_push(
        &mut self,
        _ledger: &dyn LedgerView,
        _payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        self.calls += 1;
        Err(ReceiverError::new(self.reason.clone()))
    }

    fn on_push_with_value(
        &mut self,
        _ledger: &dyn LedgerView,
        _payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        self.calls += 1;
        Err(ReceiverError::new(self.reason.clone()))
    }
}

/// Accepts plain pushes only; value-forwarding pushes use the default refusal
#[derive(Debug, Clone, Default)]
pub struct PlainReceiver {
    pub address: Address,
    pub received: usize,
}

impl PushReceiver for PlainReceiver {
    fn address(&self) -> Address {
        self.address
    }

    fn on_push(
        &mut self,
        _ledger: &dyn LedgerView,
        _payload: &PushPayload,
    ) -> Result<(), ReceiverError> {
        self.received += 1;
        Ok(())
    }
}
