//! Slack boundary for the pwnyaa CTF tracker.
//!
//! This crate covers everything pwnyaa needs from Slack:
//! - Socket Mode connection for receiving channel messages and @mentions
//! - Web API calls for posting replies and adding reactions
//! - Event parsing and command-text extraction
//!
//! # Architecture
//!
//! [`PwnyaaSlackBot`] owns the Socket Mode loop and forwards every message
//! addressed to the bot to a [`SlackEventHandler`]. Handlers answer through a
//! [`ChatPoster`], which [`SlackWebClient`] implements against the real Web
//! API and which tests replace with an in-memory fake.
//!
//! # Example
//!
//! ```rust,ignore
//! use pwnyaa_slack::{PwnyaaSlackBot, SlackConfig};
//!
//! let config = SlackConfig::from_env()?;
//! let bot = PwnyaaSlackBot::new(config, "pwnyaa").await?;
//! bot.set_event_handler(handler).await;
//! bot.start().await?;
//! ```
//!
//! # Configuration
//!
//! Required environment variables:
//! - `SLACK_BOT_TOKEN` - Bot OAuth token (xoxb-...)
//! - `SLACK_APP_TOKEN` - App-level token for Socket Mode (xapp-...)

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;

// Re-export main types
pub use bot::PwnyaaSlackBot;
pub use client::{ChatPoster, SlackWebClient};
pub use config::SlackConfig;
pub use error::{SlackError, SlackResult};
pub use events::{EventContext, SlackEvent, SlackEventHandler};
pub use messages::SlackMessageContent;
