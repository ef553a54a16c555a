use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Push token registered by a mobile client; unique per token, reassigned on re-login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceToken {
    pub token: String,
    pub user_id: Uuid,
    pub platform: String,
    pub updated_at: DateTime<Utc>,
}
