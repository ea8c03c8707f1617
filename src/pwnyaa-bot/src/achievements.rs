//! Achievement unlocking.

use std::sync::Arc;

use async_trait::async_trait;
use pwnyaa_slack::ChatPoster;
use tracing::info;

use crate::config::PostingIdentity;
use crate::error::Result;
use crate::format;

/// Receives achievement unlocks. Unlocking an already held achievement is
/// the implementation's concern.
#[async_trait]
pub trait AchievementUnlocker: Send + Sync {
    async fn unlock(&self, slack_id: &str, achievement: &str) -> Result<()>;
}

/// Announces unlocks in a channel.
pub struct ChannelAnnouncer {
    chat: Arc<dyn ChatPoster>,
    channel: String,
    identity: PostingIdentity,
}

impl ChannelAnnouncer {
    pub fn new(chat: Arc<dyn ChatPoster>, channel: impl Into<String>, identity: PostingIdentity) -> Self {
        Self {
            chat,
            channel: channel.into(),
            identity,
        }
    }
}

#[async_trait]
impl AchievementUnlocker for ChannelAnnouncer {
    async fn unlock(&self, slack_id: &str, achievement: &str) -> Result<()> {
        info!(slack_id, achievement, "Achievement unlocked");
        self.chat
            .post_message(
                &self.channel,
                self.identity
                    .message(format::achievement_unlocked(slack_id, achievement)),
            )
            .await?;
        Ok(())
    }
}
