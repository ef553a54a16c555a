use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use souk_core::repository::DeviceTokenRepository;
use souk_core::{NotificationDispatcher, NotifyError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app_config::PushConfig;

/// Gateway error codes meaning the token will never be deliverable again.
const DEAD_TOKEN_CODES: [&str; 2] = [
    "messaging/registration-token-not-registered",
    "messaging/invalid-registration-token",
];

#[derive(Debug, Serialize)]
struct MulticastMessage<'a> {
    tokens: &'a [String],
    notification: Notification<'a>,
    /// Gateways only accept string values in the data payload.
    data: BTreeMap<String, String>,
    android: AndroidOptions,
}

#[derive(Debug, Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct AndroidOptions {
    priority: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct MulticastResponse {
    #[serde(default)]
    success_count: usize,
    #[serde(default)]
    responses: Vec<SendResult>,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

fn string_data(data: &Value) -> BTreeMap<String, String> {
    let Some(map) = data.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

/// Tokens whose per-message result marks them as permanently dead. Results
/// are positional, matching the order tokens were sent in.
fn dead_tokens(tokens: &[String], response: &MulticastResponse) -> Vec<String> {
    tokens
        .iter()
        .zip(&response.responses)
        .filter(|(_, result)| {
            !result.success
                && result
                    .error
                    .as_deref()
                    .is_some_and(|code| DEAD_TOKEN_CODES.contains(&code))
        })
        .map(|(token, _)| token.clone())
        .collect()
}

/// Sends pushes through an HTTP multicast gateway, one request per user
/// covering all of that user's devices.
pub struct PushGateway {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    tokens: Arc<dyn DeviceTokenRepository>,
}

impl PushGateway {
    pub fn new(
        url: String,
        api_key: Option<String>,
        timeout: Duration,
        tokens: Arc<dyn DeviceTokenRepository>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            api_key,
            tokens,
        })
    }

    /// Builds the configured dispatcher: the HTTP gateway when a URL is set,
    /// otherwise a [`LogDispatcher`].
    pub fn from_config(
        config: &PushConfig,
        tokens: Arc<dyn DeviceTokenRepository>,
    ) -> Result<Arc<dyn NotificationDispatcher>, reqwest::Error> {
        match &config.gateway_url {
            Some(url) => {
                info!(%url, "Push gateway configured");
                let gateway = Self::new(
                    url.clone(),
                    config.api_key.clone(),
                    Duration::from_secs(config.timeout_seconds),
                    tokens,
                )?;
                Ok(Arc::new(gateway))
            }
            None => {
                warn!("No push gateway configured. Push notifications will only be logged.");
                Ok(Arc::new(LogDispatcher))
            }
        }
    }
}

#[async_trait]
impl NotificationDispatcher for PushGateway {
    async fn send(&self, user_id: Uuid, title: &str, body: &str, data: &Value) -> Result<(), NotifyError> {
        let tokens: Vec<String> = self
            .tokens
            .list_tokens(user_id)
            .await
            .map_err(NotifyError::Store)?
            .into_iter()
            .map(|t| t.token)
            .collect();
        if tokens.is_empty() {
            debug!(%user_id, "No device tokens, skipping push");
            return Ok(());
        }

        let message = MulticastMessage {
            tokens: &tokens,
            notification: Notification { title, body },
            data: string_data(data),
            android: AndroidOptions { priority: "high" },
        };

        let mut request = self.client.post(&self.url).json(&message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        let outcome: MulticastResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        debug!(%user_id, sent = outcome.success_count, devices = tokens.len(), "Push sent");

        let dead = dead_tokens(&tokens, &outcome);
        if !dead.is_empty() {
            let removed = self.tokens.delete_tokens(&dead).await.map_err(NotifyError::Store)?;
            info!(%user_id, removed, "Removed unregistered device tokens");
        }

        Ok(())
    }
}

/// Logs and drops every message. Used when no gateway is configured.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, user_id: Uuid, title: &str, body: &str, data: &Value) -> Result<(), NotifyError> {
        let keys: Vec<&String> = data.as_object().map(Map::keys).into_iter().flatten().collect();
        info!(%user_id, title, body, ?keys, "Push (not delivered, no gateway)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_values_become_strings() {
        let data = string_data(&json!({"type": "campaign", "count": 3, "live": true}));
        assert_eq!(data["type"], "campaign");
        assert_eq!(data["count"], "3");
        assert_eq!(data["live"], "true");
        assert!(string_data(&json!(null)).is_empty());
    }

    #[test]
    fn test_only_permanently_dead_tokens_are_pruned() {
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let response: MulticastResponse = serde_json::from_value(json!({
            "success_count": 1,
            "responses": [
                {"success": true},
                {"success": false, "error": "messaging/registration-token-not-registered"},
                {"success": false, "error": "messaging/internal-error"},
                {"success": false, "error": "messaging/invalid-registration-token"}
            ]
        }))
        .unwrap();

        assert_eq!(dead_tokens(&tokens, &response), vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_message_shape() {
        let tokens = vec!["t1".to_string()];
        let message = MulticastMessage {
            tokens: &tokens,
            notification: Notification { title: "New offers", body: "Diwali Sale is live" },
            data: string_data(&json!({"campaign_id": "abc"})),
            android: AndroidOptions { priority: "high" },
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["tokens"], json!(["t1"]));
        assert_eq!(value["notification"]["title"], "New offers");
        assert_eq!(value["data"]["campaign_id"], "abc");
        assert_eq!(value["android"]["priority"], "high");
    }

    #[tokio::test]
    async fn test_log_dispatcher_never_fails() {
        let result = LogDispatcher
            .send(Uuid::new_v4(), "title", "body", &json!({"type": "campaign"}))
            .await;
        assert!(result.is_ok());
    }
}
