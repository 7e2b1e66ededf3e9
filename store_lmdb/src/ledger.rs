//! LMDB implementation of LedgerStore.
//!
//! Values and versions live in separate databases keyed by the collection
//! name. Versions are big-endian `u64`; an absent key has version 0.
//! LMDB serialises write transactions, so checking expectations and applying
//! writes inside one `RwTxn` makes a batch commit atomic.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use ocl_store::{LedgerStore, StoreError, Versioned, WriteBatch};

use crate::LmdbError;

pub struct LmdbLedgerStore {
    pub(crate) env: Arc<Env>,
    pub(crate) values_db: Database<Bytes, Bytes>,
    pub(crate) versions_db: Database<Bytes, Bytes>,
}

impl LmdbLedgerStore {
    fn version_in(&self, txn: &RoTxn<'_>, key: &str) -> Result<u64, LmdbError> {
        match self.versions_db.get(txn, key.as_bytes())? {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| LmdbError::CorruptVersion(key.to_string()))?;
                Ok(u64::from_be_bytes(arr))
            }
        }
    }

    fn write_in(&self, wtxn: &mut RwTxn<'_>, key: &str, value: &[u8]) -> Result<(), LmdbError> {
        let version = self.version_in(wtxn, key)? + 1;
        self.values_db.put(wtxn, key.as_bytes(), value)?;
        self.versions_db
            .put(wtxn, key.as_bytes(), &version.to_be_bytes())?;
        Ok(())
    }
}

impl LedgerStore for LmdbLedgerStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(value) = self
            .values_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let value = value.to_vec();
        let version = self.version_in(&rtxn, key)?;
        Ok(Some(Versioned { value, version }))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.write_in(&mut wtxn, key, value)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for (key, expected) in batch.expectations() {
            let found = self.version_in(&wtxn, key)?;
            if found != expected {
                // Dropping the txn aborts it.
                return Err(StoreError::Conflict {
                    key: key.to_string(),
                    expected,
                    found,
                });
            }
        }
        for (key, value) in batch.writes() {
            self.write_in(&mut wtxn, key, value)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
