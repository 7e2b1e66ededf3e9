//! LMDB storage backend for the OCL governance contracts.
//!
//! Implements [`ocl_store::LedgerStore`] using the `heed` LMDB bindings.
//! Each contract namespace maps to a pair of LMDB databases (values and
//! versions) within a single environment.

pub mod environment;
pub mod error;
pub mod ledger;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use ledger::LmdbLedgerStore;
