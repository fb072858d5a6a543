//! Slack Socket Mode client and outbound transport.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use slack_morphism::prelude::{
    SlackApiChatPostMessageRequest, SlackApiToken, SlackApiTokenType, SlackApiTokenValue,
    SlackChannelId, SlackClient, SlackClientEventsListenerEnvironment,
    SlackClientHyperHttpsConnector, SlackClientSession, SlackClientSocketModeConfig,
    SlackClientSocketModeListener, SlackMessageContent, SlackSocketModeListenerCallbacks,
};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, error, info, warn};

use crate::models::queue::QueueMessageOut;
use crate::slack::events::{self, InboundState};
use crate::transport::Transport;
use crate::{config::SlackConfig, AppError, Result};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_POST_ATTEMPTS: u32 = 4;

fn post_request(message: &QueueMessageOut) -> SlackApiChatPostMessageRequest {
    let content = SlackMessageContent {
        text: Some(message.text.clone()),
        blocks: None,
        attachments: None,
        upload: None,
        files: None,
        reactions: None,
        metadata: None,
        markdown_text: None,
    };

    SlackApiChatPostMessageRequest {
        // A user ID as channel posts to the bot's DM with that user.
        channel: SlackChannelId(message.recipient_id.clone()),
        content,
        as_user: None,
        icon_emoji: None,
        icon_url: None,
        link_names: Some(true),
        parse: None,
        thread_ts: None,
        username: None,
        reply_broadcast: None,
        unfurl_links: None,
        unfurl_media: None,
    }
}

/// Slack HTTP client holding the bot token.
pub struct SlackService {
    client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    bot_token: SlackApiToken,
}

impl SlackService {
    /// Start the Socket Mode listener feeding `inbound`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the HTTPS connector cannot be created.
    pub fn start(config: &SlackConfig, inbound: InboundState) -> Result<(Self, JoinHandle<()>)> {
        let connector = SlackClientHyperHttpsConnector::new()
            .map_err(|err| AppError::Slack(format!("failed to init slack connector: {err}")))?;
        let client = Arc::new(SlackClient::new(connector));
        let bot_token = SlackApiToken {
            token_value: SlackApiTokenValue(config.bot_token.clone()),
            cookie: None,
            team_id: None,
            scope: None,
            token_type: Some(SlackApiTokenType::Bot),
        };
        let app_token = SlackApiToken {
            token_value: SlackApiTokenValue(config.app_token.clone()),
            cookie: None,
            team_id: None,
            scope: None,
            token_type: Some(SlackApiTokenType::App),
        };

        let socket_task = Self::spawn_socket_mode(&client, app_token, inbound);
        info!("slack socket mode started");

        Ok((Self { client, bot_token }, socket_task))
    }

    fn spawn_socket_mode(
        client: &Arc<SlackClient<SlackClientHyperHttpsConnector>>,
        app_token: SlackApiToken,
        inbound: InboundState,
    ) -> JoinHandle<()> {
        let listener_env = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(client))
                .with_error_handler(|err, _client, _state| {
                    error!(?err, "socket mode error");
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR
                })
                .with_user_state(inbound),
        );
        let callbacks = SlackSocketModeListenerCallbacks::new()
            .with_hello_events(|event, _client, _state| async move {
                info!(?event, "socket hello");
            })
            .with_push_events(events::handle_push_event);
        let config = SlackClientSocketModeConfig {
            max_connections_count: SlackClientSocketModeConfig::DEFAULT_CONNECTIONS_COUNT,
            debug_connections: SlackClientSocketModeConfig::DEFAULT_DEBUG_CONNECTIONS,
            initial_backoff_in_seconds:
                SlackClientSocketModeConfig::DEFAULT_INITIAL_BACKOFF_IN_SECONDS,
            reconnect_timeout_in_seconds:
                SlackClientSocketModeConfig::DEFAULT_RECONNECT_TIMEOUT_IN_SECONDS,
            ping_interval_in_seconds: SlackClientSocketModeConfig::DEFAULT_PING_INTERVAL_IN_SECONDS,
            ping_failure_threshold_times:
                SlackClientSocketModeConfig::DEFAULT_PING_FAILURE_THRESHOLD_TIMES,
        };

        let listener = SlackClientSocketModeListener::new(&config, listener_env, callbacks);
        tokio::spawn(async move {
            if let Err(error) = listener.listen_for(&app_token).await {
                error!(?error, "socket mode listen failed");
                return;
            }

            listener.serve().await;
            info!("socket mode listener exited");
        })
    }

    /// Create an HTTP session for direct API calls using the bot token.
    #[must_use]
    pub fn http_session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.bot_token)
    }

    /// Post a reply, backing off on rate limits and transient errors.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` once the attempts are used up.
    pub async fn post(&self, message: &QueueMessageOut) -> Result<()> {
        let request = post_request(message);
        let session = self.http_session();
        let mut backoff = INITIAL_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            match session.chat_post_message(&request).await {
                Ok(_) => {
                    debug!(recipient_id = %message.recipient_id, "sent slack message");
                    return Ok(());
                }
                Err(error) if attempt < MAX_POST_ATTEMPTS => {
                    let delay = match &error {
                        slack_morphism::errors::SlackClientError::RateLimitError(rate) => {
                            rate.retry_after.unwrap_or(backoff)
                        }
                        _ => backoff,
                    };
                    warn!(?error, delay = ?delay, attempt, "slack post failed; retrying");
                    sleep(delay).await;
                    backoff = (backoff * 2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
                Err(error) => {
                    return Err(AppError::Slack(format!(
                        "chat.postMessage failed after {attempt} attempts: {error}"
                    )));
                }
            }
        }
    }
}

impl Transport for SlackService {
    fn deliver(
        &self,
        message: &QueueMessageOut,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let message = message.clone();
        Box::pin(async move { self.post(&message).await })
    }
}
