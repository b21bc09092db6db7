/// Test data generators

use alloy_primitives::{Address, U256};
use proptest::prelude::*;
use rand::Rng;

/// Generate random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

/// Generate a random account address
pub fn random_address() -> Address {
    Address::from_slice(&random_bytes(20))
}

/// Generate a random amount below `max`
pub fn random_amount(max: u64) -> U256 {
    let mut rng = rand::thread_rng();
    U256::from(rng.gen_range(0..max.max(1)))
}

/// Deterministic account number `index`
pub fn account(index: u8) -> Address {
    Address::from([index.wrapping_add(1); 20])
}

/// One step of a generated ledger workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Advance,
    Mint { to: u8, amount: u64 },
    Burn { from: u8, amount: u64 },
    Transfer { from: u8, to: u8, amount: u64 },
}

impl LedgerOp {
    /// Accounts touched by this step, as indices
    pub fn accounts(&self) -> Vec<u8> {
        match self {
            LedgerOp::Advance => vec![],
            LedgerOp::Mint { to, .. } => vec![*to],
            LedgerOp::Burn { from, .. } => vec![*from],
            LedgerOp::Transfer { from, to, .. } => vec![*from, *to],
        }
    }
}

/// Strategy for a single step over `accounts` accounts
pub fn arb_ledger_op(accounts: u8) -> impl Strategy<Value = LedgerOp> {
    let accounts = accounts.max(1);
    prop_oneof![
        2 => Just(LedgerOp::Advance),
        3 => (0..accounts, 1u64..1_000).prop_map(|(to, amount)| LedgerOp::Mint { to, amount }),
        1 => (0..accounts, 0u64..500).prop_map(|(from, amount)| LedgerOp::Burn { from, amount }),
        4 => (0..accounts, 0..accounts, 0u64..500)
            .prop_map(|(from, to, amount)| LedgerOp::Transfer { from, to, amount }),
    ]
}

/// Strategy for a workload of up to `max_len` steps
pub fn arb_workload(accounts: u8, max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
    prop::collection::vec(arb_ledger_op(accounts), 1..=max_len.max(1))
}
