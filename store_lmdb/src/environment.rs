//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::ledger::LmdbLedgerStore;
use crate::LmdbError;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Two databases per namespace plus headroom.
pub const DEFAULT_MAX_DBS: u32 = 16;

/// Wraps the LMDB environment shared by every ledger namespace.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;
        // SAFETY: the environment is opened once per path in this process and
        // the files are not modified by anything outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        tracing::debug!(path = %path.display(), map_size, max_dbs, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (creating if needed) the ledger for a contract namespace.
    pub fn ledger(&self, namespace: &str) -> Result<LmdbLedgerStore, LmdbError> {
        let values_name = format!("{namespace}.values");
        let versions_name = format!("{namespace}.versions");
        let mut wtxn = self.env.write_txn()?;
        let values_db: Database<Bytes, Bytes> = self
            .env
            .create_database(&mut wtxn, Some(values_name.as_str()))?;
        let versions_db: Database<Bytes, Bytes> = self
            .env
            .create_database(&mut wtxn, Some(versions_name.as_str()))?;
        wtxn.commit()?;
        Ok(LmdbLedgerStore {
            env: self.env.clone(),
            values_db,
            versions_db,
        })
    }
}
