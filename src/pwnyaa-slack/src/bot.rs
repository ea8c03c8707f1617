//! Socket Mode bot loop.
//!
//! The `PwnyaaSlackBot`:
//! - Connects to Slack via Socket Mode (WebSocket)
//! - Acknowledges every envelope
//! - Forwards messages addressed to the bot to the event handler
//! - Reconnects after connection errors
//!
//! # Example
//!
//! ```rust,ignore
//! use pwnyaa_slack::{PwnyaaSlackBot, SlackConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SlackConfig::from_env()?;
//!     let bot = PwnyaaSlackBot::new(config, "pwnyaa").await?;
//!     bot.start().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::client::SlackWebClient;
use crate::config::SlackConfig;
use crate::error::{SlackError, SlackResult};
use crate::events::{
    EventContext, EventPayload, SlackEvent, SlackEventHandler, SocketModeAck, SocketModeEnvelope,
    parse_event, strip_mentions, strip_name_prefix,
};

/// Type alias for the WebSocket connection.
type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for bot behavior.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Ping interval for WebSocket keep-alive.
    pub ping_interval: Duration,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// The pwnyaa Socket Mode bot.
pub struct PwnyaaSlackBot {
    /// Web API client (shared with the handler side).
    web: SlackWebClient,
    /// Name used as the plain-text command prefix (`@<name>`).
    bot_name: String,
    /// Bot options.
    options: BotOptions,
    /// Bot's own user ID (set after auth.test).
    bot_user_id: Arc<RwLock<Option<String>>>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    /// Event handler (optional).
    event_handler: Arc<RwLock<Option<Arc<dyn SlackEventHandler>>>>,
}

impl PwnyaaSlackBot {
    /// Create a new bot with the given configuration and command name.
    pub async fn new(config: SlackConfig, bot_name: impl Into<String>) -> SlackResult<Self> {
        config.validate()?;

        let web = SlackWebClient::new(config)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            web,
            bot_name: bot_name.into(),
            options: BotOptions::default(),
            bot_user_id: Arc::new(RwLock::new(None)),
            shutdown_tx,
            event_handler: Arc::new(RwLock::new(None)),
        })
    }

    /// Replace the default bot options.
    pub fn with_options(mut self, options: BotOptions) -> Self {
        self.options = options;
        self
    }

    /// Web API client used by this bot.
    pub fn web_client(&self) -> SlackWebClient {
        self.web.clone()
    }

    /// Set the event handler for processing commands.
    pub async fn set_event_handler(&self, handler: Arc<dyn SlackEventHandler>) {
        let mut guard = self.event_handler.write().await;
        *guard = Some(handler);
    }

    /// Get the bot's user ID (if known).
    pub async fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.read().await.clone()
    }

    /// Start the bot and run until shutdown.
    pub async fn start(&self) -> SlackResult<()> {
        info!(bot_name = %self.bot_name, "Starting pwnyaa Slack bot");

        self.test_auth().await?;
        self.run_socket_mode().await
    }

    /// Shutdown the bot gracefully.
    pub fn shutdown(&self) {
        info!("Shutting down Slack bot...");
        let _ = self.shutdown_tx.send(());
    }

    /// Test authentication by calling auth.test.
    async fn test_auth(&self) -> SlackResult<()> {
        debug!("Testing Slack authentication...");

        let response = self
            .web
            .api_call("auth.test", &serde_json::json!({}))
            .await
            .map_err(|e| SlackError::Auth(format!("auth.test failed: {}", e)))?;

        if let Some(user_id) = response.get("user_id").and_then(|v| v.as_str()) {
            let mut guard = self.bot_user_id.write().await;
            *guard = Some(user_id.to_string());
            info!("Authenticated as bot user: {}", user_id);
        }

        Ok(())
    }

    /// Run the Socket Mode connection loop.
    async fn run_socket_mode(&self) -> SlackResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let ws_url = self.get_socket_mode_url().await?;

            info!("Connecting to Socket Mode...");

            match self.connect_and_run(&ws_url, &mut shutdown_rx).await {
                Ok(()) => {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    info!("Socket Mode connection closed, reconnecting");
                }
                Err(e) => {
                    error!("Socket Mode connection error: {}", e);

                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    info!("Reconnecting in {:?}...", self.options.reconnect_delay);
                    tokio::time::sleep(self.options.reconnect_delay).await;
                }
            }
        }

        Ok(())
    }

    /// Get the WebSocket URL for Socket Mode.
    async fn get_socket_mode_url(&self) -> SlackResult<String> {
        let json = self
            .web
            .call_with_token(
                "apps.connections.open",
                &serde_json::json!({}),
                self.web.config().app_token(),
            )
            .await?;

        json.get("url")
            .and_then(|u| u.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| SlackError::Api("Missing url in response".to_string()))
    }

    /// Connect to WebSocket and run event loop.
    async fn connect_and_run(
        &self,
        ws_url: &str,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SlackResult<()> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (mut write, read) = ws_stream.split();

        let (msg_tx, mut msg_rx) = mpsc::channel::<WsMessage>(100);

        let write_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        let ping_tx = msg_tx.clone();
        let ping_interval = self.options.ping_interval;
        let ping_task = tokio::spawn(async move {
            let mut interval = interval(ping_interval);
            loop {
                interval.tick().await;
                if ping_tx.send(WsMessage::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        });

        let result = self.process_messages(read, msg_tx, shutdown_rx).await;

        ping_task.abort();
        write_task.abort();

        result
    }

    /// Process incoming WebSocket messages.
    async fn process_messages(
        &self,
        mut read: SplitStream<WsConnection>,
        msg_tx: mpsc::Sender<WsMessage>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SlackResult<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            self.handle_socket_message(&text, &msg_tx).await;
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = msg_tx.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) => {
                            info!("WebSocket closed by server");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(SlackError::WebSocket(e.to_string()));
                        }
                        None => {
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Handle a Socket Mode message.
    async fn handle_socket_message(&self, text: &str, msg_tx: &mpsc::Sender<WsMessage>) {
        debug!("Received Socket Mode message: {}", text);

        let envelope: SocketModeEnvelope = match serde_json::from_str(text) {
            Ok(env) => env,
            Err(e) => {
                warn!("Failed to parse Socket Mode envelope: {}", e);
                return;
            }
        };

        // Always acknowledge first
        if !envelope.envelope_id.is_empty() {
            match serde_json::to_string(&SocketModeAck::new(&envelope.envelope_id)) {
                Ok(ack_json) => {
                    let _ = msg_tx.send(WsMessage::Text(ack_json)).await;
                }
                Err(e) => warn!("Failed to encode Socket Mode ack: {}", e),
            }
        }

        match envelope.envelope_type.as_str() {
            "events_api" => {
                if let Some(payload) = envelope.payload {
                    self.handle_event_payload(payload).await;
                }
            }
            "hello" => {
                info!("Socket Mode connection established");
            }
            "disconnect" => {
                info!("Received disconnect request from Slack");
            }
            _ => {
                debug!("Unhandled envelope type: {}", envelope.envelope_type);
            }
        }
    }

    /// Turn an events API payload into a command for the handler.
    async fn handle_event_payload(&self, payload: EventPayload) {
        let addressed = match parse_event(&payload) {
            Ok(SlackEvent::AppMention(event)) => {
                Some((strip_mentions(&event.text), EventContext::from_app_mention(&event)))
            }
            Ok(SlackEvent::Message(event)) => {
                if !event.is_plain_user_message() {
                    return;
                }
                match (
                    strip_name_prefix(&event.text, &self.bot_name),
                    EventContext::from_message(&event),
                ) {
                    (Some(command), Some(ctx)) => Some((command, ctx)),
                    _ => None,
                }
            }
            Ok(SlackEvent::Unknown) => {
                debug!("Received unknown event type");
                None
            }
            Err(e) => {
                warn!("Failed to parse event: {}", e);
                None
            }
        };

        let Some((command, ctx)) = addressed else {
            return;
        };

        let handler = self.event_handler.read().await.clone();
        let Some(handler) = handler else {
            warn!("Command received but no handler is configured");
            return;
        };

        info!(
            user = %ctx.user_id,
            channel = %ctx.channel_id,
            command = %command,
            "Dispatching command"
        );

        // Handlers fetch remote pages; keep the socket loop responsive.
        tokio::spawn(async move {
            if let Err(e) = handler.handle_command(command, ctx).await {
                error!("Event handler error: {}", e);
            }
        });
    }
}
