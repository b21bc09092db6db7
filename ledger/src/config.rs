// Ledger Configuration
//
// Name, key layout and write policy of a ledger. Built in code or loaded
// from a JSON file, and validated before any store is opened.

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::key::KeyLayout;

/// Separator between the ledger name and a persisted key
pub const NAMESPACE_SEPARATOR: char = ':';

/// What to do when a checkpoint write targets an occupied key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Fail the operation with `DuplicateCheckpoint`
    #[default]
    Reject,
    /// Replace the stored value
    Overwrite,
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Name of the tracked quantity; also namespaces persisted keys
    pub name: String,

    /// Encoding of interval keys
    pub key_layout: KeyLayout,

    /// Handling of writes to an occupied checkpoint key
    pub write_policy: WritePolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: "balance".to_string(),
            key_layout: KeyLayout::default(),
            write_policy: WritePolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Configuration for a balance ledger
    pub fn balance() -> Self {
        Self::default()
    }

    /// Configuration for a delegated voting power ledger
    pub fn voting_power() -> Self {
        Self {
            name: "voting_power".to_string(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_key_layout(mut self, layout: KeyLayout) -> Self {
        self.key_layout = layout;
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(LedgerError::InvalidConfig(
                "ledger name must not be empty".to_string(),
            ));
        }
        // ':' terminates the namespace prefix of persisted keys
        if self.name.contains(NAMESPACE_SEPARATOR) {
            return Err(LedgerError::InvalidConfig(format!(
                "ledger name {:?} must not contain {:?}",
                self.name, NAMESPACE_SEPARATOR
            )));
        }
        self.key_layout.validate()
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading ledger config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing ledger config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}
