//! Tag-All: mention every human member of a conversation, one message each.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::{BulkAction, RunContext, RunOutcome, RunReport, run_bulk};
use crate::core::models::{ChatId, Member, MessageRef, OperationKind};
use crate::errors::BotError;
use crate::messaging::MessagingClient;

/// Token in a replied-to message that is substituted with each mention.
pub const MENTION_PLACEHOLDER: &str = "{mention}";

const DEFAULT_MENTION_NAME: &str = "User";

/// What the `/tagall` invocation supplied besides the command itself.
#[derive(Debug, Clone, Default)]
pub struct TagRequest {
    pub argument: Option<String>,
    pub reply_to: Option<MessageRef>,
    pub reply_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub reply_to: Option<MessageRef>,
}

/// `@handle` when the member has one, otherwise a `<@ID|name>` user link.
#[must_use]
pub fn build_mention(member: &Member) -> String {
    match member.handle.as_deref().filter(|h| !h.is_empty()) {
        Some(handle) => format!("@{handle}"),
        None => {
            let name = member
                .display_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_MENTION_NAME);
            format!("<@{}|{name}>", member.id)
        }
    }
}

/// Pick the body and reply target for one mention.
///
/// In priority order:
/// 1. replied-to text containing `{mention}`: every placeholder substituted,
///    sent as a normal message
/// 2. reply with argument: `argument\nmention` as a reply
/// 3. reply without argument: the mention as a reply
/// 4. argument only: `argument\nmention`
/// 5. the mention alone
#[must_use]
pub fn compose_tag_message(mention: &str, request: &TagRequest) -> OutgoingMessage {
    if let Some(template) = request
        .reply_text
        .as_deref()
        .filter(|text| request.reply_to.is_some() && text.contains(MENTION_PLACEHOLDER))
    {
        return OutgoingMessage {
            text: template.replace(MENTION_PLACEHOLDER, mention),
            reply_to: None,
        };
    }

    let argument = request.argument.as_deref().filter(|a| !a.is_empty());
    let text = match argument {
        Some(argument) => format!("{argument}\n{mention}"),
        None => mention.to_string(),
    };

    OutgoingMessage {
        text,
        reply_to: request.reply_to.clone(),
    }
}

/// Bots, deleted accounts and the automation account itself are never tagged.
#[must_use]
pub fn is_taggable(member: &Member) -> bool {
    !member.is_bot && !member.is_deleted && !member.is_self
}

/// Enumerate the taggable members of `chat`.
///
/// Returns `Ok(None)` when a stop request arrives during the enumeration.
///
/// # Errors
///
/// Returns an error if the member listing fails.
pub async fn collect_targets(
    client: &dyn MessagingClient,
    chat: &ChatId,
    cancel: &CancellationToken,
) -> Result<Option<Vec<Member>>, BotError> {
    let mut members = client.enumerate_members(chat);
    let mut fetched = 0usize;
    let mut targets = Vec::new();

    while let Some(member) = members.try_next().await? {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        fetched += 1;
        if fetched % 50 == 0 {
            debug!("Fetched {} participants so far...", fetched);
        }
        if is_taggable(&member) {
            targets.push(member);
        }
    }

    Ok(Some(targets))
}

struct TagAllAction {
    client: Arc<dyn MessagingClient>,
    chat_id: ChatId,
    request: TagRequest,
}

#[async_trait]
impl BulkAction for TagAllAction {
    type Target = Member;

    fn kind(&self) -> OperationKind {
        OperationKind::Tagging
    }

    async fn act(&self, _index: usize, member: &Member) -> Result<(), BotError> {
        let mention = build_mention(member);
        let message = compose_tag_message(&mention, &self.request);
        self.client
            .send_message(&self.chat_id, &message.text, message.reply_to.as_ref())
            .await
            .map(|_| ())
    }
}

/// Run a full Tag-All pass. The controller slot is released when `ctx` drops.
pub async fn run_tag_all(ctx: RunContext, request: TagRequest) -> RunReport {
    let cancel = ctx.ticket.cancel_token().clone();

    let targets = match collect_targets(ctx.client.as_ref(), &ctx.chat_id, &cancel).await {
        Ok(Some(targets)) => targets,
        Ok(None) => {
            info!("Tagging stopped by user while collecting members");
            return ctx.report(RunOutcome::Stopped { sent: 0, total: 0 }, 0);
        }
        Err(e) => {
            error!("Error getting participants in {}: {}", ctx.chat_id, e);
            return ctx.report(
                RunOutcome::Failed {
                    sent: 0,
                    reason: e.to_string(),
                },
                0,
            );
        }
    };

    if targets.is_empty() {
        warn!("No members found to tag in {}", ctx.chat_id);
        return ctx.report(RunOutcome::Completed { sent: 0, total: 0 }, 0);
    }
    info!("Found {} members to tag", targets.len());

    let action = TagAllAction {
        client: Arc::clone(&ctx.client),
        chat_id: ctx.chat_id.clone(),
        request,
    };
    let result = run_bulk(&action, targets, &ctx.pacer, &cancel).await;
    ctx.report(result.outcome, result.failed)
}
