use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("could not create data directory: {0}")]
    Io(String),

    #[error("corrupt version record for key {0}")]
    CorruptVersion(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for ocl_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::CorruptVersion(_) => ocl_store::StoreError::Corruption(e.to_string()),
            _ => ocl_store::StoreError::Backend(e.to_string()),
        }
    }
}
