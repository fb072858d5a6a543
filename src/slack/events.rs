//! Slack push-event handler: user messages → [`Receiver`].
//!
//! Only plain user messages are admitted. Bot messages, edits, deletions
//! and other subtypes are dropped before validation so the bot never
//! answers itself.

use std::sync::Arc;

use slack_morphism::prelude::{
    SlackClient, SlackClientEventsUserState, SlackClientHyperHttpsConnector,
    SlackEventCallbackBody, SlackMessageEvent, SlackPushEventCallback,
};
use tracing::{debug, warn};

use crate::models::queue::QueueMessageIn;
use crate::pipeline::receiver::Receiver;
use crate::AppError;

/// State injected into the Socket Mode listener.
#[derive(Clone)]
pub struct InboundState {
    /// Receiver that enqueues admitted messages.
    pub receiver: Receiver,
    /// Users allowed to talk to the bot; empty admits everyone.
    pub allowed_user_ids: Vec<String>,
}

impl InboundState {
    fn admits(&self, user_id: &str) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.iter().any(|id| id == user_id)
    }
}

/// Extract `(sender, text, display name)` from a plain user message.
#[must_use]
pub fn user_message(event: &SlackMessageEvent) -> Option<(String, String, String)> {
    if event.subtype.is_some() || event.sender.bot_id.is_some() || event.hidden == Some(true) {
        return None;
    }
    let user = event.sender.user.as_ref()?.to_string();
    let text = event.content.as_ref()?.text.clone()?;
    let display_name = event.sender.username.clone().unwrap_or_else(|| user.clone());
    Some((user, text, display_name))
}

/// Handle push events delivered via Socket Mode.
///
/// # Errors
///
/// Never fails; rejected messages are logged so Slack does not retry them.
pub async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    state: SlackClientEventsUserState,
) -> slack_morphism::UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message) = event.event else {
        debug!("non-message push event ignored");
        return Ok(());
    };

    let inbound: Option<InboundState> = {
        let guard = state.read().await;
        guard.get_user_state::<InboundState>().cloned()
    };
    let Some(inbound) = inbound else {
        warn!("inbound state not available; dropping message");
        return Ok(());
    };

    let Some((sender_id, text, display_name)) = user_message(&message) else {
        debug!("bot or edited message ignored");
        return Ok(());
    };
    if !inbound.admits(&sender_id) {
        warn!(sender_id, "message from user outside the allow list ignored");
        return Ok(());
    }

    match inbound
        .receiver
        .accept(QueueMessageIn::new(sender_id, text, display_name))
        .await
    {
        Ok(_) => {}
        Err(AppError::Validation(reason)) => debug!(%reason, "message rejected"),
        Err(err) => warn!(%err, "failed to enqueue slack message"),
    }
    Ok(())
}
