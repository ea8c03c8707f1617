//! Command-line and environment configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use pwnyaa_sites::TwCredentials;
use pwnyaa_slack::SlackMessageContent;
use pwnyaa_storage::{AliasMatch, default_state_path};

use crate::error::{BotError, Result};
use crate::scheduler::ScheduleConfig;

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// pwnyaa - tracks pwnable.tw and pwnable.xyz progress in Slack.
#[derive(Parser)]
#[command(name = "pwnyaa", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path of the JSON state document.
    #[arg(long, env = "PWNYAA_STATE_PATH", global = true)]
    pub state_path: Option<PathBuf>,

    /// Channel that receives daily and weekly digests.
    #[arg(long, env = "PWNYAA_CHANNEL")]
    pub channel: Option<String>,

    /// pwnable.tw login name.
    #[arg(long, env = "TWUSER")]
    pub tw_user: Option<String>,

    /// pwnable.tw password.
    #[arg(long, env = "TWPW", hide_env_values = true)]
    pub tw_password: Option<String>,

    /// Name the bot answers to (`@<name> list`) and posts as.
    #[arg(long, env = "PWNYAA_BOT_NAME", default_value = "pwnyaa")]
    pub bot_name: String,

    /// Emoji icon used for posts.
    #[arg(long, default_value = ":pwn:")]
    pub icon_emoji: String,

    /// Contest name comparison: `exact` or `case-insensitive`.
    #[arg(long, default_value = "exact", value_parser = AliasMatch::from_str)]
    pub alias_match: AliasMatch,

    /// Minutes between challenge refreshes.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_minutes: u64,

    /// Local time of the daily digest (HH:MM).
    #[arg(long, default_value = "09:00", value_parser = parse_clock)]
    pub daily_at: NaiveTime,

    /// Local time of the weekly ranking (HH:MM).
    #[arg(long, default_value = "21:00", value_parser = parse_clock)]
    pub weekly_at: NaiveTime,

    /// Day of the weekly ranking.
    #[arg(long, default_value = "sun", value_parser = parse_weekday)]
    pub weekly_day: Weekday,

    /// Log level; `RUST_LOG` takes precedence when set.
    #[arg(long, value_enum, env = "PWNYAA_LOG_LEVEL", default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("command", &self.command)
            .field("state_path", &self.state_path)
            .field("channel", &self.channel)
            .field("tw_user", &self.tw_user)
            .field("tw_password", &self.tw_password.as_ref().map(|_| "[REDACTED]"))
            .field("bot_name", &self.bot_name)
            .field("icon_emoji", &self.icon_emoji)
            .field("alias_match", &self.alias_match)
            .field("refresh_minutes", &self.refresh_minutes)
            .field("daily_at", &self.daily_at)
            .field("weekly_at", &self.weekly_at)
            .field("weekly_day", &self.weekly_day)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Connect to Slack and run the bot (default).
    Run,
    /// Refresh challenge counts of every site once and exit.
    Refresh,
    /// Print the contest summary from the state document.
    List,
}

fn parse_clock(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| format!("invalid time '{s}', expected HH:MM: {e}"))
}

fn parse_weekday(s: &str) -> std::result::Result<Weekday, String> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("invalid weekday '{s}'"))
}

impl Cli {
    /// Subcommand to run, `run` when none was given.
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_path {
            Some(path) => Ok(path.clone()),
            None => Ok(default_state_path()?),
        }
    }

    /// Digest channel; required by `run`.
    pub fn digest_channel(&self) -> Result<String> {
        self.channel
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BotError::Config("--channel or PWNYAA_CHANNEL is required".into()))
    }

    /// pwnable.tw login, when both halves are configured.
    pub fn tw_credentials(&self) -> Option<TwCredentials> {
        match (&self.tw_user, &self.tw_password) {
            (Some(user), Some(password)) => Some(TwCredentials::new(user, password)),
            _ => None,
        }
    }

    pub fn identity(&self) -> PostingIdentity {
        PostingIdentity::new(&self.bot_name, &self.icon_emoji)
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            refresh_every: Duration::from_secs(self.refresh_minutes * 60),
            daily_at: self.daily_at,
            weekly_at: self.weekly_at,
            weekly_day: self.weekly_day,
        }
    }
}

/// Name and icon every post is made under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingIdentity {
    pub username: String,
    pub icon_emoji: String,
}

impl PostingIdentity {
    pub fn new(username: impl Into<String>, icon_emoji: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            icon_emoji: icon_emoji.into(),
        }
    }

    /// Message content carrying this identity.
    pub fn message(&self, text: impl Into<String>) -> SlackMessageContent {
        SlackMessageContent::new(text).with_identity(&self.username, &self.icon_emoji)
    }
}

impl Default for PostingIdentity {
    fn default() -> Self {
        Self::new("pwnyaa", ":pwn:")
    }
}
