// Checkpoint Clock
//
// Source of epoch boundaries. The explicit variant is a counter advanced by
// `advance()`; the implicit variant derives the epoch from an external
// monotonic tick (block height) and never needs advancing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, Result};
use crate::types::Epoch;

/// Monotonically non-decreasing epoch source
pub trait CheckpointClock {
    /// Current epoch; never decreases between calls
    fn current_epoch(&self) -> Epoch;

    /// Open a new boundary and return the new epoch
    fn advance(&mut self) -> Result<Epoch> {
        Err(LedgerError::Unsupported(
            "this clock advances with its external tick source",
        ))
    }

    /// Whether the counter is owned (and persisted) by the ledger
    fn is_explicit(&self) -> bool {
        false
    }

    /// Restore a persisted counter when reopening a ledger
    fn resume(&mut self, _epoch: Epoch) {}
}

/// Counter advanced by explicit `advance()` calls
#[derive(Debug, Clone, Default)]
pub struct ExplicitClock {
    epoch: Epoch,
}

impl ExplicitClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(epoch: Epoch) -> Self {
        Self { epoch }
    }
}

impl CheckpointClock for ExplicitClock {
    fn current_epoch(&self) -> Epoch {
        self.epoch
    }

    fn advance(&mut self) -> Result<Epoch> {
        self.epoch = self
            .epoch
            .checked_add(1)
            .ok_or(LedgerError::Unsupported("epoch counter exhausted"))?;
        Ok(self.epoch)
    }

    fn is_explicit(&self) -> bool {
        true
    }

    fn resume(&mut self, epoch: Epoch) {
        self.epoch = self.epoch.max(epoch);
    }
}

/// External monotonic tick, e.g. the height of the block being executed
pub trait TickSource {
    fn tick(&self) -> u64;
}

impl<F> TickSource for F
where
    F: Fn() -> u64,
{
    fn tick(&self) -> u64 {
        self()
    }
}

/// Shared tick counter driven by the host
///
/// Clones observe the same counter, so a host can keep one handle to bump
/// the height while the ledger's clock reads another.
#[derive(Debug, Clone, Default)]
pub struct SharedTicks(Arc<AtomicU64>);

impl SharedTicks {
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    /// Move the tick forward by one and return the new tick
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Move the tick forward to `tick`; earlier values are ignored
    pub fn set(&self, tick: u64) {
        self.0.fetch_max(tick, Ordering::SeqCst);
    }
}

impl TickSource for SharedTicks {
    fn tick(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clock whose every tick is a boundary: `current_epoch = tick - 1`
#[derive(Debug, Clone)]
pub struct TickClock<T> {
    source: T,
}

impl<T: TickSource> TickClock<T> {
    pub fn new(source: T) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}

impl<T: TickSource> CheckpointClock for TickClock<T> {
    fn current_epoch(&self) -> Epoch {
        self.source.tick().saturating_sub(1)
    }
}
