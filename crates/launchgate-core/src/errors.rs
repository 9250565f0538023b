use crate::types::GateType;

/// Errors surfaced by the public gate operations.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown gate type {0}")]
    UnknownGateType(GateType),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o failure: {0}")]
    Io(String),
    #[error("store data is corrupt: {0}")]
    Corrupt(String),
    #[error("store lock unavailable: {0}")]
    Locked(String),
    #[error("record not found: {0}")]
    Missing(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },
}
