//! pwnyaa - main entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pwnyaa_sites::{CtfSite, PwnableTw, PwnableXyz};
use pwnyaa_slack::{ChatPoster, PwnyaaSlackBot, SlackConfig};
use pwnyaa_storage::StateStore;
use tracing::{info, warn};

use pwnyaa_bot::{
    ChannelAnnouncer, Cli, Commands, Dispatcher, Jobs, Scheduler, SiteRegistry, format,
};

/// `RUST_LOG` wins; otherwise our crates log at `--log-level` and
/// dependencies at `warn`.
fn init_tracing(cli: &Cli) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = cli.log_level.as_filter_str();
        ["pwnyaa", "pwnyaa_bot", "pwnyaa_slack", "pwnyaa_sites", "pwnyaa_storage"]
            .iter()
            .fold("warn".to_string(), |acc, target| format!("{acc},{target}={level}"))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_sites(cli: &Cli) -> Result<SiteRegistry> {
    let credentials = cli.tw_credentials();
    if credentials.is_none() {
        warn!("TWUSER/TWPW not set, pwnable.tw profiles will be fetched without logging in");
    }

    let tw: Arc<dyn CtfSite> =
        Arc::new(PwnableTw::new(credentials).context("Failed to set up pwnable.tw client")?);
    let xyz: Arc<dyn CtfSite> =
        Arc::new(PwnableXyz::new().context("Failed to set up pwnable.xyz client")?);
    Ok(SiteRegistry::new(vec![tw, xyz]))
}

async fn open_store(cli: &Cli) -> Result<Arc<StateStore>> {
    let path = cli.state_path()?;
    let store = StateStore::open(&path)
        .await
        .with_context(|| format!("Failed to open state at {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn run(cli: &Cli) -> Result<()> {
    let channel = cli.digest_channel()?;
    let store = open_store(cli).await?;
    let sites = build_sites(cli)?;
    let identity = cli.identity();

    let slack_config = SlackConfig::from_env().context("Slack credentials are not configured")?;
    let bot = Arc::new(PwnyaaSlackBot::new(slack_config, &cli.bot_name).await?);
    let chat: Arc<dyn ChatPoster> = Arc::new(bot.web_client());

    let dispatcher = Dispatcher::new(
        store.clone(),
        sites.clone(),
        chat.clone(),
        cli.alias_match,
        identity.clone(),
    );
    bot.set_event_handler(Arc::new(dispatcher)).await;

    let unlocker = Arc::new(ChannelAnnouncer::new(
        chat.clone(),
        channel.clone(),
        identity.clone(),
    ));
    let jobs = Arc::new(Jobs::new(store, sites, chat, unlocker, channel, identity));
    let handles = Scheduler::new(jobs, cli.schedule()).spawn();

    let runner = bot.clone();
    let bot_task = tokio::spawn(async move { runner.start().await });

    tokio::select! {
        result = bot_task => {
            match result {
                Ok(Ok(())) => info!("Slack bot stopped"),
                Ok(Err(e)) => return Err(e).context("Slack bot failed"),
                Err(e) => return Err(e).context("Slack bot task panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C");
            bot.shutdown();
        }
    }

    for handle in handles {
        handle.abort();
    }
    Ok(())
}

async fn refresh(cli: &Cli) -> Result<()> {
    let store = open_store(cli).await?;
    let sites = build_sites(cli)?;
    let summary = pwnyaa_bot::refresh_all(&store, &sites).await;
    println!(
        "inserted: {}, updated: {}, skipped: {}",
        summary.inserted, summary.updated, summary.skipped
    );
    Ok(())
}

async fn list(cli: &Cli) -> Result<()> {
    let store = open_store(cli).await?;
    println!("{}", format::contest_summary(&store.snapshot().await.contests));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command() {
        Commands::Run => run(&cli).await,
        Commands::Refresh => refresh(&cli).await,
        Commands::List => list(&cli).await,
    }
}
