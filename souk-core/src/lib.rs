pub mod notify;
pub mod repository;

pub use notify::{NotificationDispatcher, NotifyError};
pub use repository::{RepoError, RepoResult};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Write aborted and rolled back: {0}")]
    TransactionFailed(#[source] RepoError),
    #[error("Store error: {0}")]
    StoreError(#[source] RepoError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
