use thiserror::Error;

use crate::object_id::ObjectId;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("No event found with id {0}")]
    NotFound(ObjectId),
    #[error("{field}.{index} does not exist (length {len})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to replace snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Snapshot writer did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Snapshot document {id} is invalid: {source}")]
    InvalidDocument {
        id: ObjectId,
        source: ValidationError,
    },
}

impl StoreError {
    /// True for rejections caused by the submitted values rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
