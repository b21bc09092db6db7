// Interval Key Codec
//
// An interval key names one checkpoint record: the account plus the half-open
// epoch interval it covers. The canonical byte form is
//
//     account (20 bytes) || from (epoch_bytes, BE) || to (epoch_bytes, BE)
//
// so anyone holding the change log can rebuild a key without asking the ledger.
// With the default 6-byte epochs the key is exactly one 32-byte word.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};
use crate::types::{AccountId, Epoch};

const ACCOUNT_BYTES: usize = 20;
const MAX_EPOCH_BYTES: usize = 8;
const WORD_BYTES: usize = 32;

/// Address of a checkpoint record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalKey {
    pub account: AccountId,
    pub from: Epoch,
    pub to: Epoch,
}

impl IntervalKey {
    /// Build a key, rejecting empty or inverted intervals
    pub fn new(account: AccountId, from: Epoch, to: Epoch) -> Result<Self> {
        if from >= to {
            return Err(LedgerError::InvalidRange(format!(
                "interval [{}, {}) is empty",
                from, to
            )));
        }
        Ok(Self { account, from, to })
    }

    /// Whether `epoch` falls inside `[from, to)`
    pub fn contains(&self, epoch: Epoch) -> bool {
        self.from <= epoch && epoch < self.to
    }
}

impl fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {})", self.account, self.from, self.to)
    }
}

/// Width of the epoch fields in the canonical key encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLayout {
    pub epoch_bytes: usize,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self { epoch_bytes: 6 }
    }
}

impl KeyLayout {
    pub fn new(epoch_bytes: usize) -> Result<Self> {
        let layout = Self { epoch_bytes };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epoch_bytes == 0 || self.epoch_bytes > MAX_EPOCH_BYTES {
            return Err(LedgerError::InvalidConfig(format!(
                "epoch_bytes must be within 1..={}, got {}",
                MAX_EPOCH_BYTES, self.epoch_bytes
            )));
        }
        Ok(())
    }

    /// Length of an encoded key in bytes
    pub fn encoded_len(&self) -> usize {
        ACCOUNT_BYTES + 2 * self.epoch_bytes
    }

    /// Largest epoch representable in this layout
    pub fn max_epoch(&self) -> Epoch {
        if self.epoch_bytes >= MAX_EPOCH_BYTES {
            Epoch::MAX
        } else {
            (1u64 << (self.epoch_bytes * 8)) - 1
        }
    }

    /// Reject keys this layout cannot encode
    pub fn check(&self, key: &IntervalKey) -> Result<()> {
        if key.from >= key.to {
            return Err(LedgerError::InvalidRange(format!(
                "interval [{}, {}) is empty",
                key.from, key.to
            )));
        }
        let max = self.max_epoch();
        if key.to > max {
            return Err(LedgerError::InvalidRange(format!(
                "epoch {} exceeds the {}-byte key layout (max {})",
                key.to, self.epoch_bytes, max
            )));
        }
        Ok(())
    }

    pub fn encode(&self, key: &IntervalKey) -> Result<Vec<u8>> {
        self.check(key)?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(key.account.as_slice());
        out.extend_from_slice(&key.from.to_be_bytes()[MAX_EPOCH_BYTES - self.epoch_bytes..]);
        out.extend_from_slice(&key.to.to_be_bytes()[MAX_EPOCH_BYTES - self.epoch_bytes..]);
        Ok(out)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<IntervalKey> {
        if bytes.len() != self.encoded_len() {
            return Err(LedgerError::InvalidRange(format!(
                "encoded key must be {} bytes, got {}",
                self.encoded_len(),
                bytes.len()
            )));
        }
        let account = Address::from_slice(&bytes[..ACCOUNT_BYTES]);
        let from_end = ACCOUNT_BYTES + self.epoch_bytes;
        let from = self.read_epoch(&bytes[ACCOUNT_BYTES..from_end]);
        let to = self.read_epoch(&bytes[from_end..]);
        IntervalKey::new(account, from, to)
    }

    /// `0x`-prefixed hex form of the canonical encoding
    pub fn encode_hex(&self, key: &IntervalKey) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.encode(key)?)))
    }

    pub fn decode_hex(&self, text: &str) -> Result<IntervalKey> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits)
            .map_err(|e| LedgerError::InvalidRange(format!("malformed key hex: {}", e)))?;
        self.decode(&bytes)
    }

    /// Pack the key into a single word; needs a layout of at most 32 bytes
    pub fn encode_u256(&self, key: &IntervalKey) -> Result<U256> {
        let bytes = self.encode(key)?;
        U256::try_from_be_slice(&bytes).ok_or_else(|| {
            LedgerError::InvalidRange(format!(
                "{}-byte key does not fit in a 32-byte word",
                bytes.len()
            ))
        })
    }

    pub fn decode_u256(&self, word: U256) -> Result<IntervalKey> {
        let len = self.encoded_len();
        if len > WORD_BYTES {
            return Err(LedgerError::InvalidRange(format!(
                "{}-byte key does not fit in a 32-byte word",
                len
            )));
        }
        let bytes = word.to_be_bytes::<WORD_BYTES>();
        let (padding, body) = bytes.split_at(WORD_BYTES - len);
        if padding.iter().any(|b| *b != 0) {
            return Err(LedgerError::InvalidRange(
                "word has bits above the key layout".to_string(),
            ));
        }
        self.decode(body)
    }

    fn read_epoch(&self, bytes: &[u8]) -> Epoch {
        let mut buf = [0u8; MAX_EPOCH_BYTES];
        buf[MAX_EPOCH_BYTES - self.epoch_bytes..].copy_from_slice(bytes);
        Epoch::from_be_bytes(buf)
    }
}
