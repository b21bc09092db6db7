/// Testing utilities for the snapshot ledger
///
/// Provides:
/// - Random accounts, amounts and operation sequences
/// - Push receiver fixtures
/// - Log capture for tests

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledger=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}
