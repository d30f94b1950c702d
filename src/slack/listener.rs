//! Socket Mode listener
//!
//! Receives message events and slash commands over a Slack Socket Mode
//! connection, converts them into [`InboundMessage`]s and hands each one to
//! the [`Router`] on its own task so a long-running command never blocks the
//! event loop.

use std::sync::Arc;

use slack_morphism::prelude::*;
use tracing::{debug, error, info};

use crate::commands::{Dispatch, Router};
use crate::core::models::{ChatId, InboundMessage, MessageRef, UserId};
use crate::errors::BotError;

/// Slack prefixes direct-message conversation ids with `D`.
fn is_group_channel(channel_id: &str) -> bool {
    !channel_id.starts_with('D')
}

/// Build an [`InboundMessage`] from the raw identifiers of a message event.
///
/// A `thread_ts` that differs from the message's own `ts` makes the message a
/// reply to the thread's parent.
#[must_use]
pub fn inbound_message(
    channel_id: &str,
    ts: &str,
    thread_ts: Option<&str>,
    user_id: &str,
    text: &str,
) -> InboundMessage {
    let chat_id = ChatId::new(channel_id);
    let reply_to = thread_ts
        .filter(|parent| *parent != ts)
        .map(|parent| MessageRef::new(chat_id.clone(), parent));

    InboundMessage {
        sender: UserId::new(user_id),
        chat_id: chat_id.clone(),
        message: Some(MessageRef::new(chat_id, ts)),
        text: text.to_string(),
        reply_to,
        is_group: is_group_channel(channel_id),
    }
}

/// Rebuild the command line of a slash command.
///
/// Slack command names are fixed, so `/spam 3 hi` is accepted as `/spam3 hi`.
fn command_line(command: &str, text: &str) -> String {
    let text = text.trim();
    if command == "/spam" {
        let (count, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        if !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) {
            return format!("/spam{count} {}", rest.trim()).trim_end().to_string();
        }
    }
    format!("{command} {text}").trim_end().to_string()
}

/// Build an [`InboundMessage`] from a slash command invocation.
///
/// Slash commands are not posted to the conversation, so there is no trigger
/// message to delete and no thread to reply into.
#[must_use]
pub fn inbound_command(
    channel_id: &str,
    user_id: &str,
    command: &str,
    text: &str,
) -> InboundMessage {
    InboundMessage {
        sender: UserId::new(user_id),
        chat_id: ChatId::new(channel_id),
        message: None,
        text: command_line(command, text),
        reply_to: None,
        is_group: is_group_channel(channel_id),
    }
}

/// Convert a Slack message event; edits, joins and other subtypes yield `None`.
fn inbound_from_event(event: &SlackMessageEvent) -> Option<InboundMessage> {
    if event.subtype.is_some() {
        return None;
    }
    let text = event.content.as_ref()?.text.as_deref()?;
    let user = event.sender.user.as_ref()?;
    let channel = event.origin.channel.as_ref()?;

    Some(inbound_message(
        &channel.0,
        &event.origin.ts.0,
        event.origin.thread_ts.as_ref().map(|ts| ts.0.as_str()),
        &user.0,
        text,
    ))
}

async fn on_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message_event) = event.event else {
        return Ok(());
    };
    let Some(inbound) = inbound_from_event(&message_event) else {
        return Ok(());
    };

    spawn_dispatch(&states, inbound).await;
    Ok(())
}

async fn on_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<SlackCommandEventResponse> {
    let inbound = inbound_command(
        &event.channel_id.0,
        &event.user_id.0,
        &event.command.0,
        event.text.as_deref().unwrap_or_default(),
    );
    spawn_dispatch(&states, inbound).await;

    Ok(SlackCommandEventResponse::new(SlackMessageContent::new()))
}

/// Hand `inbound` to the router on its own task.
async fn spawn_dispatch(states: &SlackClientEventsUserState, inbound: InboundMessage) {
    let router = {
        let guard = states.read().await;
        guard.get_user_state::<Arc<Router>>().cloned()
    };
    let Some(router) = router else {
        error!("Router state missing from listener environment");
        return;
    };

    tokio::spawn(async move {
        match router.dispatch(inbound).await {
            Dispatch::Ignored => {}
            other => debug!("Dispatched message: {:?}", other),
        }
    });
}

/// Connect over Socket Mode and serve events until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the HTTP connector cannot be built or the socket
/// connection cannot be registered.
pub async fn serve(app_token: &str, router: Arc<Router>) -> Result<(), BotError> {
    let connector = SlackClientHyperConnector::new().map_err(|e| {
        BotError::GeneralError(format!("Failed to create Slack HTTP connector: {e}"))
    })?;
    let client = Arc::new(SlackHyperClient::new(connector));

    let callbacks = SlackSocketModeListenerCallbacks::new()
        .with_push_events(on_push_event)
        .with_command_events(on_command_event);
    let environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(client).with_user_state(router),
    );

    let listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        environment,
        callbacks,
    );

    let token = SlackApiToken::new(SlackApiTokenValue::new(app_token.to_string()));
    listener
        .listen_for(&token)
        .await
        .map_err(|e| BotError::ApiError(format!("Socket Mode connection failed: {e}")))?;

    info!("Listening for Slack events");
    listener.serve().await;
    info!("Socket Mode listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_message_has_no_reply() {
        let msg = inbound_message("C1", "100.1", None, "U1", "/tagall hi");

        assert_eq!(msg.chat_id, ChatId::new("C1"));
        assert_eq!(msg.message.map(|m| m.id).as_deref(), Some("100.1"));
        assert_eq!(msg.sender, UserId::new("U1"));
        assert!(msg.reply_to.is_none());
        assert!(msg.is_group);
    }

    #[test]
    fn thread_reply_points_at_parent() {
        let msg = inbound_message("C1", "100.2", Some("100.1"), "U1", "/tagall");
        let parent = msg.reply_to.expect("reply");

        assert_eq!(parent.id, "100.1");
        assert_eq!(parent.chat_id, ChatId::new("C1"));
    }

    #[test]
    fn thread_parent_is_not_a_reply_to_itself() {
        let msg = inbound_message("C1", "100.1", Some("100.1"), "U1", "/ping");
        assert!(msg.reply_to.is_none());
    }

    #[test]
    fn direct_messages_are_not_groups() {
        let msg = inbound_message("D42", "1.0", None, "U1", "/tagall");
        assert!(!msg.is_group);
    }

    #[test]
    fn slash_command_becomes_command_text() {
        let msg = inbound_command("C1", "U1", "/tagall", " Standup in 5 ");

        assert_eq!(msg.text, "/tagall Standup in 5");
        assert_eq!(msg.sender, UserId::new("U1"));
        assert!(msg.message.is_none());
        assert!(msg.reply_to.is_none());
        assert!(msg.is_group);
    }

    #[test]
    fn slash_spam_count_is_glued_to_the_command() {
        assert_eq!(command_line("/spam", "3 hello"), "/spam3 hello");
        assert_eq!(command_line("/spam", "12"), "/spam12");
        assert_eq!(command_line("/spam", "hello there"), "/spam hello there");
        assert_eq!(command_line("/spam", ""), "/spam");
    }

    #[test]
    fn slash_commands_without_text_keep_the_bare_name() {
        assert_eq!(inbound_command("C1", "U1", "/stoptag", "").text, "/stoptag");
        assert!(!inbound_command("D9", "U1", "/tagall", "").is_group);
    }
}
