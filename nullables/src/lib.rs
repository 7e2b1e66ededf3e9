//! Nullable infrastructure for deterministic testing.
//!
//! All external collaborators (clock, ledger storage, caller identity,
//! cross-contract transport) are abstracted behind traits. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (including injected faults)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod identity;
pub mod invoker;
pub mod store;

pub use clock::NullClock;
pub use identity::NullIdentity;
pub use invoker::{InvokeRecord, NullInvoker};
pub use store::NullLedgerStore;
