use redis::RedisResult;

/// Redis connection used for request rate limiting.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter: `INCR` then `EXPIRE` in one transaction.
    /// Returns whether the caller is still within `limit` for the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// Rate limit key for one client address in the current one-minute window.
pub fn rate_limit_key(client: &str, epoch_seconds: i64) -> String {
    format!("rate:{}:{}", client, epoch_seconds / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_changes_once_per_minute() {
        assert_eq!(rate_limit_key("10.0.0.1", 120), rate_limit_key("10.0.0.1", 179));
        assert_ne!(rate_limit_key("10.0.0.1", 179), rate_limit_key("10.0.0.1", 180));
        assert_ne!(rate_limit_key("10.0.0.1", 120), rate_limit_key("10.0.0.2", 120));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisClient::new("not a redis url").is_err());
    }
}
