//! pwnyaa: a Slack bot that tracks members' progress on pwnable.tw and
//! pwnable.xyz.
//!
//! # Module Structure
//!
//! - [`config`] - Command-line/environment configuration and posting identity
//! - [`registry`] - The set of tracked sites
//! - [`reconciler`] - Folds fetched challenge lists into the state store
//! - [`dispatcher`] - `list`, `join` and `check` chat commands
//! - [`digest`] - Daily digest, weekly ranking and achievement thresholds
//! - [`achievements`] - Achievement unlock seam
//! - [`scheduler`] - Periodic refresh and calendar jobs under one lock
//! - [`format`] - User-facing texts

pub mod achievements;
pub mod config;
pub mod digest;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod reconciler;
pub mod registry;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use achievements::{AchievementUnlocker, ChannelAnnouncer};
pub use config::{Cli, Commands, LogLevel, PostingIdentity};
pub use dispatcher::{Command, Dispatcher};
pub use error::{BotError, Result};
pub use reconciler::{RefreshSummary, merge_challenge_snapshot, refresh_all};
pub use registry::SiteRegistry;
pub use scheduler::{Jobs, ScheduleConfig, Scheduler};
