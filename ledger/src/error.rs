use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::key::IntervalKey;
use crate::types::Epoch;

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Column family not found: {0}")]
    MissingColumnFamily(&'static str),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Ledger operation errors
///
/// Every variant aborts the enclosing operation; nothing is committed.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No checkpoint recorded for {0}")]
    CheckpointMiss(IntervalKey),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Epoch {target} is outside the validity window [{from}, {to})")]
    StaleTarget { target: Epoch, from: Epoch, to: Epoch },

    #[error("Insufficient value for {account}: has {available}, needs {requested}")]
    InsufficientValue {
        account: Address,
        available: U256,
        requested: U256,
    },

    #[error("Value overflow for {0}")]
    ValueOverflow(Address),

    #[error("Receiver {receiver} rejected push: {reason}")]
    ReceiverCallbackFailure { receiver: Address, reason: String },

    #[error("Checkpoint already recorded for {0}")]
    DuplicateCheckpoint(IntervalKey),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failure reported by a push receiver callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ReceiverError(pub String);

impl ReceiverError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
