//! Event handling for Slack events.
//!
//! Handles the events pwnyaa subscribes to:
//! - `message.channels` - Channel messages starting with `@pwnyaa`
//! - `app_mention` - Real `<@BOT>` mentions
//!
//! Events are received via Socket Mode WebSocket connection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SlackError, SlackResult};

/// Slack event types that we handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// App mention event (<@pwnyaa> in a channel).
    AppMention(AppMentionEvent),
    /// Channel or direct message event.
    Message(MessageEvent),
    /// Unknown event type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

/// Event payload for app mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMentionEvent {
    /// User who mentioned the bot.
    pub user: String,
    /// Text of the message (including the mention).
    pub text: String,
    /// Channel where the mention occurred.
    pub channel: String,
    /// Timestamp of the message.
    pub ts: String,
    /// Thread timestamp (if in a thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// Event payload for messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// User who sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Text of the message.
    #[serde(default)]
    pub text: String,
    /// Channel where the message was sent.
    pub channel: String,
    /// Timestamp of the message.
    pub ts: String,
    /// Thread timestamp (if in a thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Subtype of message (e.g., "bot_message", "message_changed").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Bot ID (if message is from a bot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Plain user-authored messages only: no subtype, no bot author.
    pub fn is_plain_user_message(&self) -> bool {
        self.subtype.is_none() && self.bot_id.is_none() && self.user.is_some()
    }
}

/// Socket Mode envelope wrapping events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketModeEnvelope {
    /// Envelope ID for acknowledgment (absent on `hello`).
    #[serde(default)]
    pub envelope_id: String,
    /// Type of payload.
    #[serde(rename = "type")]
    pub envelope_type: String,
    /// Actual payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

/// Event callback payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    /// Team ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// The actual event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<serde_json::Value>,
    /// Event ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// Socket Mode acknowledgment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketModeAck {
    /// Envelope ID being acknowledged.
    pub envelope_id: String,
}

impl SocketModeAck {
    /// Create a simple acknowledgment.
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
        }
    }
}

/// Strip a leading `@<bot_name>` prefix and return the command text after it.
///
/// Returns `None` when the message is not addressed to the bot. The prefix
/// must be followed by whitespace or end the message.
///
/// # Example
///
/// ```rust
/// use pwnyaa_slack::events::strip_name_prefix;
///
/// assert_eq!(strip_name_prefix("@pwnyaa join tw alice", "pwnyaa"), Some("join tw alice".to_string()));
/// assert_eq!(strip_name_prefix("hello @pwnyaa", "pwnyaa"), None);
/// ```
pub fn strip_name_prefix(text: &str, bot_name: &str) -> Option<String> {
    let rest = text.strip_prefix('@')?.strip_prefix(bot_name)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().to_string())
}

/// Remove every `<@USER>` / `<@USER|name>` mention from the text.
pub fn strip_mentions(text: &str) -> String {
    let mut result = text.to_string();

    while let Some(start) = result.find("<@") {
        if let Some(end) = result[start..].find('>') {
            result = format!("{}{}", &result[..start], &result[start + end + 1..]);
        } else {
            break;
        }
    }

    result.trim().to_string()
}

/// Context for processing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// User ID who triggered the event.
    pub user_id: String,
    /// Channel ID where the event occurred.
    pub channel_id: String,
    /// Timestamp of the triggering message (reaction target, thread root).
    pub message_ts: String,
    /// Existing thread timestamp, if the message was posted in a thread.
    pub thread_ts: Option<String>,
}

impl EventContext {
    /// Create context from an app mention event.
    pub fn from_app_mention(event: &AppMentionEvent) -> Self {
        Self {
            user_id: event.user.clone(),
            channel_id: event.channel.clone(),
            message_ts: event.ts.clone(),
            thread_ts: event.thread_ts.clone(),
        }
    }

    /// Create context from a message event.
    pub fn from_message(event: &MessageEvent) -> Option<Self> {
        let user_id = event.user.clone()?;

        Some(Self {
            user_id,
            channel_id: event.channel.clone(),
            message_ts: event.ts.clone(),
            thread_ts: event.thread_ts.clone(),
        })
    }

    /// Timestamp to thread replies under.
    pub fn thread_root(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.message_ts)
    }
}

/// Trait for handling commands addressed to the bot.
#[async_trait::async_trait]
pub trait SlackEventHandler: Send + Sync {
    /// Handle the command text that followed the bot's name or mention.
    async fn handle_command(&self, command: String, context: EventContext) -> SlackResult<()>;
}

/// Parse a raw event from the Socket Mode envelope.
pub fn parse_event(payload: &EventPayload) -> SlackResult<SlackEvent> {
    let event_json = payload
        .event
        .as_ref()
        .ok_or_else(|| SlackError::InvalidPayload("Missing event field".to_string()))?;

    let event_type = event_json
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");

    debug!("Parsing event type: {}", event_type);

    match event_type {
        "app_mention" => {
            let event: AppMentionEvent = serde_json::from_value(event_json.clone())?;
            Ok(SlackEvent::AppMention(event))
        }
        "message" => {
            let event: MessageEvent = serde_json::from_value(event_json.clone())?;
            Ok(SlackEvent::Message(event))
        }
        _ => Ok(SlackEvent::Unknown),
    }
}
