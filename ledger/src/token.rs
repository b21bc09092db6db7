// Token operations
//
// Balance-style entry points on top of the ledger facade. Multi-leg
// operations are staged on one tracker, so a transfer either moves value on
// both sides or on neither.

use alloy_primitives::U256;

use crate::clock::CheckpointClock;
use crate::error::Result;
use crate::key::IntervalKey;
use crate::ledger::{ensure_owner, Ledger};
use crate::store::LedgerStore;
use crate::types::{AccountId, Delta};

impl<C: CheckpointClock, S: LedgerStore> Ledger<C, S> {
    /// Create `amount` out of nothing for `to`
    pub fn mint(&mut self, to: AccountId, amount: U256) -> Result<U256> {
        self.mutate(to, Delta::Increase(amount))
    }

    /// Destroy `amount` held by `from`
    pub fn burn(&mut self, from: AccountId, amount: U256) -> Result<U256> {
        self.mutate(from, Delta::Decrease(amount))
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: U256) -> Result<()> {
        self.commit(|tracker| {
            tracker.apply(from, Delta::Decrease(amount))?;
            tracker.apply(to, Delta::Increase(amount))?;
            Ok(())
        })
    }

    /// Transfer, then reclaim one of the sender's stale records
    pub fn transfer_and_reclaim(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: U256,
        stale_key: IntervalKey,
    ) -> Result<()> {
        ensure_owner(from, &stale_key)?;
        self.commit(|tracker| {
            tracker.apply(from, Delta::Decrease(amount))?;
            tracker.apply(to, Delta::Increase(amount))?;
            tracker.reclaim(stale_key)?;
            Ok(())
        })
    }
}
