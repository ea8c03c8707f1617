//! Error types for the bot.

use pwnyaa_sites::SiteError;
use pwnyaa_slack::SlackError;
use pwnyaa_storage::StorageError;
use thiserror::Error;

/// Errors raised while handling a command or running a job.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("Site error: {0}")]
    Site(#[from] SiteError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<BotError> for SlackError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::Slack(e) => e,
            other => SlackError::Handler(other.to_string()),
        }
    }
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
