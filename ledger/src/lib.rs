// Snapshot Ledger
//
// Lazily checkpointed balance and voting power ledgers.
//
// This crate tracks a per-account quantity and answers historical queries:
// - Checkpoint-on-write: history is flushed only by the first mutation after
//   a boundary, so creating a boundary costs nothing
// - Interval keys addressing one stored value per account and interval
// - Explicit (counter) and implicit (block tick) checkpoint clocks
// - Push of live or historical values to third-party receivers
// - In-memory and RocksDB persistence with atomic batches
// - Off-ledger key reconstruction from the change log

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
pub mod ledger;
pub mod push;
pub mod storage;
pub mod store;
pub mod token;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use clock::{CheckpointClock, ExplicitClock, SharedTicks, TickClock, TickSource};
pub use config::{LedgerConfig, WritePolicy};
pub use error::{LedgerError, ReceiverError, Result, StorageError};
pub use events::{KeyReconstructor, LedgerEvent};
pub use key::{IntervalKey, KeyLayout};
pub use ledger::{BalanceLedger, Ledger, VotingPowerLedger};
pub use push::{
    BankCheckpoint, IPushReceiver, LedgerView, NativeBank, PushNotifier, PushPayload,
    PushReceiver, ValueBank,
};
pub use storage::{open_db, RocksStore};
pub use store::{LedgerStore, MemoryStore, StoreOp, StoreResult};
pub use tracker::AccountTracker;
pub use types::{AccountId, AccountState, CheckpointRecord, Delta, Epoch};
