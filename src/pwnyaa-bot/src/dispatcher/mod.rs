//! Chat command handling: `list`, `join`, and `check`.
//!
//! Every outcome is a chat reply, including misuse, lookups that find
//! nothing, and internal failures. An error reaches the caller only when
//! the failure notice itself cannot be posted.

use std::sync::Arc;

use async_trait::async_trait;
use pwnyaa_slack::{ChatPoster, EventContext, SlackEventHandler, SlackResult};
use pwnyaa_storage::{AliasMatch, StateStore};
use tracing::{debug, info, warn};

use crate::config::PostingIdentity;
use crate::error::Result;
use crate::format;
use crate::registry::SiteRegistry;

/// Reaction acknowledging a `join` whose contest resolved.
const JOIN_ACK_REACTION: &str = "ok";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Join {
        contest: Option<String>,
        id_ctf: Option<String>,
    },
    Check {
        contest: Option<String>,
    },
    Unknown(String),
}

impl Command {
    /// Parse the text that followed the bot's name.
    pub fn parse(text: &str) -> Self {
        let mut args = text.split_whitespace().map(str::to_string);
        match args.next().as_deref() {
            Some("list") => Command::List,
            Some("join") => Command::Join {
                contest: args.next(),
                id_ctf: args.next(),
            },
            Some("check") => Command::Check {
                contest: args.next(),
            },
            other => Command::Unknown(other.unwrap_or_default().to_string()),
        }
    }
}

/// Answers commands from the state store and the tracked sites.
pub struct Dispatcher {
    store: Arc<StateStore>,
    sites: SiteRegistry,
    chat: Arc<dyn ChatPoster>,
    alias_match: AliasMatch,
    identity: PostingIdentity,
}

impl Dispatcher {
    pub fn new(
        store: Arc<StateStore>,
        sites: SiteRegistry,
        chat: Arc<dyn ChatPoster>,
        alias_match: AliasMatch,
        identity: PostingIdentity,
    ) -> Self {
        Self {
            store,
            sites,
            chat,
            alias_match,
            identity,
        }
    }

    pub async fn dispatch(&self, command: Command, ctx: &EventContext) -> Result<()> {
        debug!(?command, user = %ctx.user_id, channel = %ctx.channel_id, "Dispatching command");
        let Err(error) = self.execute(command, ctx).await else {
            return Ok(());
        };

        warn!(error = %error, user = %ctx.user_id, "Command failed");
        if let Err(e) = self.reply(ctx, format::COMMAND_FAILED).await {
            warn!(error = %e, "Failed to report command failure");
            return Err(error);
        }
        Ok(())
    }

    async fn execute(&self, command: Command, ctx: &EventContext) -> Result<()> {
        match command {
            Command::List => self.list(ctx).await,
            Command::Join {
                contest: Some(contest),
                id_ctf: Some(id_ctf),
            } => self.join(ctx, &contest, &id_ctf).await,
            Command::Join { .. } => self.reply(ctx, format::JOIN_USAGE).await,
            Command::Check {
                contest: Some(contest),
            } => self.check(ctx, &contest).await,
            Command::Check { contest: None } => self.reply(ctx, format::CHECK_USAGE).await,
            Command::Unknown(_) => self.reply(ctx, format::UNKNOWN_COMMAND).await,
        }
    }

    async fn list(&self, ctx: &EventContext) -> Result<()> {
        let state = self.store.snapshot().await;
        self.reply(ctx, format::contest_summary(&state.contests))
            .await
    }

    async fn join(&self, ctx: &EventContext, name: &str, id_ctf: &str) -> Result<()> {
        let Some(contest) = self.store.find_contest(name, self.alias_match).await else {
            info!(contest = name, "join: contest not found");
            self.reply(ctx, format::contest_not_found(name)).await?;
            return self.list(ctx).await;
        };

        self.store.register_user(&ctx.user_id).await?;
        if let Err(e) = self
            .chat
            .add_reaction(&ctx.channel_id, &ctx.message_ts, JOIN_ACK_REACTION)
            .await
        {
            warn!(error = %e, "Failed to acknowledge join");
        }

        let profile = match self.sites.for_contest(&contest) {
            Some(site) => site.fetch_profile(id_ctf).await,
            None => {
                warn!(contest = %contest.title, "No site for contest");
                None
            }
        };

        match profile {
            Some(profile) => {
                self.store
                    .link_user(contest.id, &ctx.user_id, id_ctf)
                    .await?;
                self.reply(ctx, format::joined(&profile)).await
            }
            None => {
                info!(contest = %contest.title, id_ctf, "join: user not found");
                self.reply(ctx, format::user_not_found(id_ctf, &contest.title))
                    .await
            }
        }
    }

    async fn check(&self, ctx: &EventContext, name: &str) -> Result<()> {
        let Some((contest, user)) = self
            .store
            .find_membership(&ctx.user_id, name, self.alias_match)
            .await
        else {
            return self.reply(ctx, format::not_joined(name)).await;
        };

        let profile = match self.sites.for_contest(&contest) {
            Some(site) => site.fetch_profile(&user.id_ctf).await,
            None => None,
        };
        let Some(profile) = profile else {
            warn!(contest = %contest.title, id_ctf = %user.id_ctf, "check: profile unavailable");
            return self
                .reply(ctx, format::user_not_found(&user.id_ctf, &contest.title))
                .await;
        };

        self.reply(ctx, format::check_notice(&profile)).await?;
        self.chat
            .post_message(
                &ctx.channel_id,
                self.identity
                    .message(format::check_detail(&profile))
                    .in_thread(ctx.thread_root()),
            )
            .await?;
        Ok(())
    }

    async fn reply(&self, ctx: &EventContext, text: impl Into<String>) -> Result<()> {
        self.chat
            .post_message(&ctx.channel_id, self.identity.message(text))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SlackEventHandler for Dispatcher {
    async fn handle_command(&self, command: String, context: EventContext) -> SlackResult<()> {
        Ok(self.dispatch(Command::parse(&command), &context).await?)
    }
}

#[cfg(test)]
mod tests;
