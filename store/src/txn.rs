//! Per-invocation transaction over a [`LedgerStore`].
//!
//! Reads go through to the store (or return the value already staged by this
//! transaction) and record the version they observed. Writes are staged and
//! reach the store only on [`LedgerTxn::commit`]. Dropping the transaction
//! without committing discards every staged write.

use crate::{LedgerStore, StoreError, WriteBatch};

pub struct LedgerTxn<'a> {
    store: &'a dyn LedgerStore,
    batch: WriteBatch,
}

impl<'a> LedgerTxn<'a> {
    pub fn begin(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            batch: WriteBatch::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(staged) = self.batch.staged(key) {
            return Ok(Some(staged.to_vec()));
        }
        let found = self.store.get(key)?;
        self.batch
            .expect_version(key, found.as_ref().map_or(0, |v| v.version));
        Ok(found.map(|v| v.value))
    }

    /// Require `key` to still be at `version` on commit, as if it had been
    /// read by this transaction at that version.
    pub fn expect_version(&mut self, key: &str, version: u64) {
        self.batch.expect_version(key, version);
    }

    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        self.batch.put(key, value);
    }

    /// Commit every staged write in one atomic batch.
    pub fn commit(self) -> Result<(), StoreError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        tracing::debug!(keys = self.batch.writes().count(), "committing ledger transaction");
        self.store.commit(&self.batch)
    }
}
