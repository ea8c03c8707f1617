//! Outgoing message content.

use serde::{Deserialize, Serialize};

/// Content of a `chat.postMessage` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessageContent {
    /// Message text (mrkdwn).
    pub text: String,
    /// Thread timestamp (for replies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Display name override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Icon emoji override, e.g. `:pwn:`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
}

impl SlackMessageContent {
    /// Create message content with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set thread timestamp (for replies).
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// Post under a custom name and emoji icon.
    pub fn with_identity(mut self, username: impl Into<String>, icon_emoji: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.icon_emoji = Some(icon_emoji.into());
        self
    }

    /// Build the JSON body for `chat.postMessage`.
    pub fn to_payload(&self, channel: &str) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "channel": channel,
            "text": self.text,
        });
        if let Some(thread_ts) = &self.thread_ts {
            payload["thread_ts"] = serde_json::json!(thread_ts);
        }
        if let Some(username) = &self.username {
            payload["username"] = serde_json::json!(username);
        }
        if let Some(icon_emoji) = &self.icon_emoji {
            payload["icon_emoji"] = serde_json::json!(icon_emoji);
        }
        payload
    }
}
