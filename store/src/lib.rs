//! Collaborator traits for the OCL governance engine.
//!
//! The engine never talks to a concrete ledger, identity service or contract
//! transport. Every backend (LMDB, in-memory for testing, a remote peer)
//! implements these traits and the engine depends only on them.

pub mod error;
pub mod identity;
pub mod invoker;
pub mod ledger;
pub mod txn;

pub use error::{IdentityError, InvokeError, StoreError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use invoker::InterContractInvoker;
pub use ledger::{LedgerStore, Versioned, WriteBatch};
pub use txn::LedgerTxn;
