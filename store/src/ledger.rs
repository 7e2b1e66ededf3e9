//! Key-value ledger storage trait.
//!
//! Values are opaque byte blobs addressed by a collection key. Every stored
//! key carries a version that increases on each write; version `0` means the
//! key is absent. Batches commit atomically and only when every version they
//! were read at is still current (first committer wins).

use std::collections::BTreeMap;

use crate::StoreError;

/// A stored value together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: u64,
}

/// A set of writes plus the read versions they depend on.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    expected: BTreeMap<String, u64>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to still be at `version` when the batch commits.
    /// Only the first observation of a key is kept.
    pub fn expect_version(&mut self, key: &str, version: u64) {
        self.expected.entry(key.to_string()).or_insert(version);
    }

    /// Stage a write, replacing any earlier staged value for the same key.
    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        self.writes.insert(key.to_string(), value);
    }

    /// The staged value for `key`, if any.
    pub fn staged(&self, key: &str) -> Option<&[u8]> {
        self.writes.get(key).map(Vec::as_slice)
    }

    pub fn expectations(&self) -> impl Iterator<Item = (&str, u64)> {
        self.expected.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn writes(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Whether the batch stages no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Trait for ledger storage backends.
pub trait LedgerStore: Send + Sync {
    /// Read a value and its version. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError>;

    /// Unconditionally write a single value, bumping its version.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Apply every write in `batch` atomically, or none of them.
    ///
    /// Fails with [`StoreError::Conflict`] if any expected version is stale.
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;

    /// Read only the value.
    fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(key)?.map(|v| v.value))
    }
}
