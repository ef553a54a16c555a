use async_trait::async_trait;
use souk_core::repository::{DeviceTokenRepository, RepoResult};
use souk_shared::models::DeviceToken;
use sqlx::PgPool;
use uuid::Uuid;

use crate::rows::DeviceTokenRow;

pub struct PostgresDeviceTokenRepository {
    pub pool: PgPool,
}

#[async_trait]
impl DeviceTokenRepository for PostgresDeviceTokenRepository {
    async fn upsert_token(&self, user_id: Uuid, token: &str, platform: &str) -> RepoResult<DeviceToken> {
        // A token moves to whichever user last logged in on the device.
        let row = sqlx::query_as::<_, DeviceTokenRow>(
            "INSERT INTO user_device_tokens (token, user_id, platform, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (token)
             DO UPDATE SET user_id = EXCLUDED.user_id, platform = EXCLUDED.platform, updated_at = NOW()
             RETURNING token, user_id, platform, updated_at",
        )
        .bind(token)
        .bind(user_id)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_tokens(&self, user_id: Uuid) -> RepoResult<Vec<DeviceToken>> {
        let rows = sqlx::query_as::<_, DeviceTokenRow>(
            "SELECT token, user_id, platform, updated_at
             FROM user_device_tokens
             WHERE user_id = $1
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DeviceToken::from).collect())
    }

    async fn delete_tokens(&self, tokens: &[String]) -> RepoResult<u64> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM user_device_tokens WHERE token = ANY($1)")
            .bind(tokens)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
