use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("write conflict on key {key}: expected version {expected}, found {found}")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("unknown contract {target} on channel {channel}")]
    UnknownContract { target: String, channel: String },

    #[error("contract {target} has no operation {operation}")]
    UnknownOperation { target: String, operation: String },

    #[error("contract {target} rejected {operation}: {reason}")]
    Rejected {
        target: String,
        operation: String,
        reason: String,
    },

    #[error("contract {target} could not store {operation}: {source}")]
    Store {
        target: String,
        operation: String,
        #[source]
        source: StoreError,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no caller identity available")]
    Unavailable,

    #[error("invalid caller identity: {0}")]
    Invalid(String),
}
