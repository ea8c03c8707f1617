//! Slack Web API client.
//!
//! [`ChatPoster`] is the narrow outgoing surface the rest of pwnyaa talks to;
//! [`SlackWebClient`] implements it with `chat.postMessage` and `reactions.add`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SlackConfig;
use crate::error::{SlackApiError, SlackError, SlackResult};
use crate::messages::SlackMessageContent;

/// Outgoing chat operations.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    /// Post a message to a channel, returning the new message's `ts`.
    async fn post_message(&self, channel: &str, content: SlackMessageContent)
    -> SlackResult<String>;

    /// Add an emoji reaction to a message.
    async fn add_reaction(&self, channel: &str, ts: &str, emoji: &str) -> SlackResult<()>;
}

/// Web API client authenticated with the bot token.
#[derive(Clone)]
pub struct SlackWebClient {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackWebClient {
    /// Create a new Web API client.
    pub fn new(config: SlackConfig) -> SlackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SlackError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Access the configuration this client was built with.
    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    /// Make an API call authenticated with the bot token.
    pub async fn api_call(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> SlackResult<serde_json::Value> {
        self.call_with_token(method, payload, self.config.bot_token())
            .await
    }

    /// Make an API call authenticated with the given token and check `ok`.
    pub(crate) async fn call_with_token(
        &self,
        method: &str,
        payload: &serde_json::Value,
        token: &str,
    ) -> SlackResult<serde_json::Value> {
        let url = format!("{}/{}", self.config.api_base_url(), method);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await?;

        if response.status() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            return Err(SlackError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!("{}: {}", status, body)));
        }

        let json: serde_json::Value = response.json().await?;
        if json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(SlackApiError::from_response(&json).into());
        }

        debug!(method, "Slack API call succeeded");
        Ok(json)
    }
}

#[async_trait]
impl ChatPoster for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        content: SlackMessageContent,
    ) -> SlackResult<String> {
        let response = self
            .api_call("chat.postMessage", &content.to_payload(channel))
            .await?;

        response
            .get("ts")
            .and_then(|ts| ts.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| SlackError::Api("Missing ts in response".to_string()))
    }

    async fn add_reaction(&self, channel: &str, ts: &str, emoji: &str) -> SlackResult<()> {
        let payload = serde_json::json!({
            "channel": channel,
            "timestamp": ts,
            "name": emoji.trim_matches(':'),
        });

        match self.api_call("reactions.add", &payload).await {
            Ok(_) => Ok(()),
            Err(SlackError::Api(code)) if code == "already_reacted" => Ok(()),
            Err(e) => Err(e),
        }
    }
}
