use async_trait::async_trait;
use uuid::Uuid;

use crate::repository::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Push transport failed: {0}")]
    Transport(String),
    #[error("Push gateway rejected the message with status {0}")]
    Rejected(u16),
    #[error("Device token lookup failed: {0}")]
    Store(#[source] RepoError),
}

/// Outbound push delivery. Callers treat every failure as best-effort.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> Result<(), NotifyError>;
}
