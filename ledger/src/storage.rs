// RocksDB Store
//
// Accounts, checkpoint records and the explicit clock counter live in
// separate column families. Every key is prefixed with the ledger name so a
// balance ledger and a voting power ledger can share one database.

use alloy_primitives::U256;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

use crate::config::{LedgerConfig, NAMESPACE_SEPARATOR};
use crate::error::StorageError;
use crate::key::{IntervalKey, KeyLayout};
use crate::store::{LedgerStore, StoreOp, StoreResult};
use crate::types::{AccountId, AccountState, Epoch};

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_CHECKPOINTS: &str = "checkpoints";
const CF_METADATA: &str = "metadata";

/// Metadata keys
const KEY_EPOCH: &[u8] = b"epoch";

/// Open (or create) a database with the ledger column families
pub fn open_db(path: &Path) -> StoreResult<Arc<DB>> {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);

    let cfs = vec![
        ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default()),
        ColumnFamilyDescriptor::new(CF_CHECKPOINTS, Options::default()),
        ColumnFamilyDescriptor::new(CF_METADATA, Options::default()),
    ];

    let db = DB::open_cf_descriptors(&opts, path, cfs)?;
    Ok(Arc::new(db))
}

/// Ledger store backed by RocksDB
pub struct RocksStore {
    db: Arc<DB>,
    namespace: Vec<u8>,
    layout: KeyLayout,
}

impl RocksStore {
    /// Open a store at `path` for the ledger described by `config`
    pub fn open(path: &Path, config: &LedgerConfig) -> StoreResult<Self> {
        let db = open_db(path)?;
        Ok(Self::with_db(db, config))
    }

    /// Use an already opened database, shared with other ledgers
    pub fn with_db(db: Arc<DB>, config: &LedgerConfig) -> Self {
        let mut namespace = config.name.as_bytes().to_vec();
        namespace.push(NAMESPACE_SEPARATOR as u8);
        Self {
            db,
            namespace,
            layout: config.key_layout,
        }
    }

    /// Number of checkpoint records held for this ledger
    pub fn checkpoint_count(&self) -> StoreResult<usize> {
        let cf = self.get_cf(CF_CHECKPOINTS)?;
        let mode = IteratorMode::From(self.namespace.as_slice(), Direction::Forward);

        let mut count = 0;
        for item in self.db.iterator_cf(cf, mode) {
            let (key, _) = item?;
            if !key.starts_with(&self.namespace) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Get reference to the underlying DB
    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }

    fn get_cf(&self, name: &'static str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or(StorageError::MissingColumnFamily(name))
    }

    fn prefixed(&self, body: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.namespace.len() + body.len());
        key.extend_from_slice(&self.namespace);
        key.extend_from_slice(body);
        key
    }

    fn account_key(&self, account: &AccountId) -> Vec<u8> {
        self.prefixed(account.as_slice())
    }

    fn checkpoint_key(&self, key: &IntervalKey) -> StoreResult<Vec<u8>> {
        let body = self
            .layout
            .encode(key)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        Ok(self.prefixed(&body))
    }
}

impl LedgerStore for RocksStore {
    fn account(&self, account: &AccountId) -> StoreResult<Option<AccountState>> {
        let cf = self.get_cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, self.account_key(account))? {
            Some(bytes) => {
                let state = bincode::deserialize(&bytes)
                    .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    fn checkpoint(&self, key: &IntervalKey) -> StoreResult<Option<U256>> {
        let cf = self.get_cf(CF_CHECKPOINTS)?;
        match self.db.get_cf(cf, self.checkpoint_key(key)?)? {
            Some(bytes) => {
                if bytes.len() != 32 {
                    return Err(StorageError::InvalidData(format!(
                        "checkpoint value for {} is {} bytes",
                        key,
                        bytes.len()
                    )));
                }
                Ok(Some(U256::from_be_slice(&bytes)))
            }
            None => Ok(None),
        }
    }

    fn epoch(&self) -> StoreResult<Option<Epoch>> {
        let cf = self.get_cf(CF_METADATA)?;
        match self.db.get_cf(cf, self.prefixed(KEY_EPOCH))? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::InvalidData("epoch counter is not 8 bytes".to_string())
                })?;
                Ok(Some(Epoch::from_le_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    fn apply(&mut self, ops: Vec<StoreOp>) -> StoreResult<()> {
        let cf_accounts = self.get_cf(CF_ACCOUNTS)?;
        let cf_checkpoints = self.get_cf(CF_CHECKPOINTS)?;
        let cf_metadata = self.get_cf(CF_METADATA)?;

        let mut batch = WriteBatch::default();
        for op in &ops {
            match op {
                StoreOp::PutAccount(account, state) => {
                    let bytes = bincode::serialize(state)
                        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                    batch.put_cf(cf_accounts, self.account_key(account), bytes);
                }
                StoreOp::PutCheckpoint(key, value) => {
                    batch.put_cf(
                        cf_checkpoints,
                        self.checkpoint_key(key)?,
                        value.to_be_bytes::<32>(),
                    );
                }
                StoreOp::DeleteCheckpoint(key) => {
                    batch.delete_cf(cf_checkpoints, self.checkpoint_key(key)?);
                }
                StoreOp::PutEpoch(epoch) => {
                    batch.put_cf(cf_metadata, self.prefixed(KEY_EPOCH), epoch.to_le_bytes());
                }
            }
        }

        self.db.write(batch)?;
        Ok(())
    }
}
