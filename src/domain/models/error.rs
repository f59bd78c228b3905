use thiserror::Error;

/// Failure recorded by a store action. Kept `Clone` so the same value can sit
/// in the store's `error` slot and be returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{context}: {reason}")]
    Request { context: String, reason: String },

    #[error("{0}")]
    Precondition(String),
}

impl StoreError {
    pub fn request(context: &str, err: anyhow::Error) -> StoreError {
        return StoreError::Request {
            context: context.to_string(),
            reason: format!("{err:#}"),
        };
    }

    pub fn precondition(reason: &str) -> StoreError {
        return StoreError::Precondition(reason.to_string());
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
