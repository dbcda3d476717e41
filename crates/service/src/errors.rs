use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Any read, parse, serialize or write failure against the record store.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("revision mismatch: expected {expected}, current {current}")]
    RevisionMismatch { expected: String, current: String },
}

impl ServiceError {
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(format!("{context}: {err}"))
    }
}
