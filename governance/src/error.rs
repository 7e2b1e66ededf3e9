use ocl_store::{IdentityError, InvokeError, StoreError};
use thiserror::Error;

/// A collection blob read from the ledger could not be turned into typed state.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("collection {key} is malformed: {reason}")]
    Malformed { key: String, reason: String },

    #[error("collection {key} violates an invariant: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to encode collection {key}: {reason}")]
    Encode { key: String, reason: String },
}

/// An invocation named an unknown operation or carried missing/malformed arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Need more args for {operation}: expected {expected}, got {got}.")]
    Missing {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Malformed {argument} for {operation}: {value:?}.")]
    Malformed {
        operation: &'static str,
        argument: &'static str,
        value: String,
    },

    #[error("Bad function name: {0}")]
    UnknownOperation(String),

    #[error("Bad route name: {0}")]
    UnknownRoute(String),

    #[error("Operation {operation} is not served by the {route} contract.")]
    WrongRoute {
        operation: &'static str,
        route: &'static str,
    },
}

/// A hard failure: the operation aborted and nothing was committed.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("cross-contract call failed: {0}")]
    Invoke(#[from] InvokeError),

    #[error("{0}")]
    Argument(#[from] ArgumentError),
}

impl GovernanceError {
    /// Whether the operation lost a write race and may be retried as a whole.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Conflict { .. })
                | Self::Invoke(InvokeError::Store {
                    source: StoreError::Conflict { .. },
                    ..
                })
        )
    }
}
