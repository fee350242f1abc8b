//! Entry operation errors.

use diary_shared::error::AppError;
use diary_shared::types::EntryId;
use thiserror::Error;

use super::types::FieldErrors;
use crate::storage::StorageError;

/// Entry operation errors.
#[derive(Debug, Error)]
pub enum EntryError {
    /// No identity was supplied for an operation that needs one.
    #[error("sign-in required")]
    Unauthorized,

    /// Entry does not exist or belongs to someone else.
    #[error("diary entry not found: {0}")]
    NotFound(EntryId),

    /// The submitted form failed validation.
    #[error("invalid entry: {0}")]
    Validation(FieldErrors),

    /// The row changed underneath an update.
    #[error("diary entry {0} was modified concurrently, please retry")]
    Conflict(EntryId),

    /// Upload request carried no file or an empty one.
    #[error("no file uploaded")]
    EmptyUpload,

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl EntryError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<EntryError> for AppError {
    fn from(err: EntryError) -> Self {
        match err {
            EntryError::Unauthorized => Self::Unauthorized(err.to_string()),
            EntryError::NotFound(id) => Self::NotFound(format!("diary entry {id}")),
            EntryError::Validation(ref errors) => Self::Validation(errors.to_string()),
            EntryError::Conflict(_) => Self::Conflict(err.to_string()),
            EntryError::EmptyUpload => Self::Validation("No file uploaded.".to_string()),
            EntryError::Storage(StorageError::Rejected { status, body }) => {
                Self::Upstream { status, body }
            }
            EntryError::Storage(StorageError::NotConfigured(what)) => {
                Self::Internal(format!("object storage is not configured: missing {what}"))
            }
            EntryError::Storage(other) => Self::ExternalService(other.to_string()),
            EntryError::Repository(msg) => Self::Database(msg),
        }
    }
}
