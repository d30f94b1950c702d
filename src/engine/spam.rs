//! Repeat-Send: post the same text N times.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::executor::{BulkAction, RunContext, RunReport, run_bulk};
use crate::core::models::{ChatId, MessageRef, OperationKind};
use crate::errors::BotError;
use crate::messaging::MessagingClient;

/// Why a `/spam` request was turned down before it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamRefusal {
    TooMany { requested: u64, max: u32 },
    MissingText,
}

impl fmt::Display for SpamRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpamRefusal::TooMany { requested, max } => {
                write!(f, "Spam count {requested} exceeds maximum {max}")
            }
            SpamRefusal::MissingText => f.write_str("Spam command received without text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamPlan {
    pub count: u32,
    pub text: String,
    pub reply_to: Option<MessageRef>,
}

impl SpamPlan {
    /// Validate a request. A count above `max` refuses the whole run rather
    /// than being lowered to `max`; a missing count uses `default`.
    ///
    /// # Errors
    ///
    /// Returns the [`SpamRefusal`] describing why nothing may be sent.
    pub fn resolve(
        requested: Option<u64>,
        text: &str,
        reply_to: Option<MessageRef>,
        default: u32,
        max: u32,
    ) -> Result<Self, SpamRefusal> {
        let count = match requested {
            Some(requested) if requested > u64::from(max) => {
                return Err(SpamRefusal::TooMany { requested, max });
            }
            Some(requested) => u32::try_from(requested).unwrap_or(max),
            None => default,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(SpamRefusal::MissingText);
        }

        Ok(Self {
            count,
            text: text.to_string(),
            reply_to,
        })
    }
}

struct SpamAction {
    client: Arc<dyn MessagingClient>,
    chat_id: ChatId,
    text: String,
    reply_to: Option<MessageRef>,
}

#[async_trait]
impl BulkAction for SpamAction {
    type Target = u32;

    fn kind(&self) -> OperationKind {
        OperationKind::Spam
    }

    async fn act(&self, _index: usize, _repetition: &u32) -> Result<(), BotError> {
        self.client
            .send_message(&self.chat_id, &self.text, self.reply_to.as_ref())
            .await
            .map(|_| ())
    }
}

/// Send `plan.count` copies of the text. The controller slot is released
/// when `ctx` drops.
pub async fn run_spam(ctx: RunContext, plan: SpamPlan) -> RunReport {
    info!("Starting spam: {} messages in chat {}", plan.count, ctx.chat_id);

    let action = SpamAction {
        client: Arc::clone(&ctx.client),
        chat_id: ctx.chat_id.clone(),
        text: plan.text,
        reply_to: plan.reply_to,
    };
    let result = run_bulk(&action, 0..plan.count, &ctx.pacer, ctx.ticket.cancel_token()).await;
    ctx.report(result.outcome, result.failed)
}
