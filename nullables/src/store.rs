//! Nullable ledger store: thread-safe in-memory storage for testing.

use ocl_store::{LedgerStore, StoreError, Versioned, WriteBatch};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory versioned key-value ledger.
/// Thread-safe; batch commits check and apply under one lock.
pub struct NullLedgerStore {
    entries: Mutex<HashMap<String, Versioned>>,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
}

impl NullLedgerStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_reads: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Make every subsequent read fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write or commit fail with a backend error.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Current version of `key` (0 if absent).
    pub fn version(&self, key: &str) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map_or(0, |v| v.version)
    }

    /// Raw value of `key` as a UTF-8 string, for assertions.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|v| String::from_utf8_lossy(&v.value).into_owned())
    }

    fn write_locked(entries: &mut HashMap<String, Versioned>, key: &str, value: &[u8]) {
        let version = entries.get(key).map_or(0, |v| v.version) + 1;
        entries.insert(
            key.to_string(),
            Versioned {
                value: value.to_vec(),
                version,
            },
        );
    }
}

impl Default for NullLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for NullLedgerStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("injected read failure on {key}")));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("injected write failure on {key}")));
        }
        Self::write_locked(&mut self.entries.lock().unwrap(), key, value);
        Ok(())
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        for (key, expected) in batch.expectations() {
            let found = entries.get(key).map_or(0, |v| v.version);
            if found != expected {
                return Err(StoreError::Conflict {
                    key: key.to_string(),
                    expected,
                    found,
                });
            }
        }
        for (key, value) in batch.writes() {
            Self::write_locked(&mut entries, key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocl_store::LedgerTxn;

    #[test]
    fn absent_key_reads_none() {
        let store = NullLedgerStore::new();
        assert!(store.get("Votes").unwrap().is_none());
        assert_eq!(store.version("Votes"), 0);
    }

    #[test]
    fn put_bumps_version() {
        let store = NullLedgerStore::new();
        store.put("Votes", b"[]").unwrap();
        store.put("Votes", b"[]").unwrap();
        assert_eq!(store.version("Votes"), 2);
    }

    #[test]
    fn txn_commits_all_writes_together() {
        let store = NullLedgerStore::new();
        let mut txn = LedgerTxn::begin(&store);
        assert!(txn.get("Votes").unwrap().is_none());
        txn.put("Votes", b"[1]".to_vec());
        txn.put("Operators", b"[2]".to_vec());
        assert_eq!(txn.get("Votes").unwrap(), Some(b"[1]".to_vec()));
        assert!(store.get("Votes").unwrap().is_none());
        txn.commit().unwrap();
        assert_eq!(store.get_string("Votes").as_deref(), Some("[1]"));
        assert_eq!(store.get_string("Operators").as_deref(), Some("[2]"));
    }

    #[test]
    fn first_committer_wins() {
        let store = NullLedgerStore::new();
        store.put("Votes", b"[]").unwrap();

        let mut first = LedgerTxn::begin(&store);
        let mut second = LedgerTxn::begin(&store);
        first.get("Votes").unwrap();
        second.get("Votes").unwrap();
        first.put("Votes", b"[\"a\"]".to_vec());
        second.put("Votes", b"[\"b\"]".to_vec());
        second.put("Operators", b"[]".to_vec());

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, found: 2, .. }));
        assert_eq!(store.get_string("Votes").as_deref(), Some("[\"a\"]"));
        assert!(store.get("Operators").unwrap().is_none());
    }

    #[test]
    fn version_seen_elsewhere_guards_blind_write() {
        let store = NullLedgerStore::new();
        let seen = store.version("Operators");
        store.put("Operators", b"[1]").unwrap();

        let mut txn = LedgerTxn::begin(&store);
        txn.expect_version("Operators", seen);
        txn.put("Operators", b"[2]".to_vec());
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, found: 1, .. }));
        assert_eq!(store.get_string("Operators").as_deref(), Some("[1]"));
    }

    #[test]
    fn dropped_txn_writes_nothing() {
        let store = NullLedgerStore::new();
        {
            let mut txn = LedgerTxn::begin(&store);
            txn.put("ListAction", b"[]".to_vec());
        }
        assert!(store.get("ListAction").unwrap().is_none());
    }

    #[test]
    fn injected_faults() {
        let store = NullLedgerStore::new();
        store.fail_reads(true);
        assert!(matches!(store.get("Votes"), Err(StoreError::Backend(_))));
        store.fail_reads(false);
        store.fail_commits(true);
        assert!(store.put("Votes", b"[]").is_err());
        assert!(store.commit(&WriteBatch::new()).is_err());
    }
}
