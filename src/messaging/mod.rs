//! The messaging backend as seen by the command core.
//!
//! The core never talks to a concrete chat API; it only needs these five
//! primitives. [`crate::slack::SlackClient`] is the production implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::core::models::{ChatId, Member, MessageRef, RepliedMessage, UserId};
use crate::errors::BotError;

/// Lazy, finite member listing. Not restartable: call
/// [`MessagingClient::enumerate_members`] again for a fresh pass.
pub type MemberStream<'a> = BoxStream<'a, Result<Member, BotError>>;

#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Post `text` into `chat`, optionally as a reply to an existing message.
    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        reply_to: Option<&MessageRef>,
    ) -> Result<MessageRef, BotError>;

    fn enumerate_members<'a>(&'a self, chat: &'a ChatId) -> MemberStream<'a>;

    /// Best-effort removal of a message.
    async fn delete_message(&self, message: &MessageRef) -> Result<(), BotError>;

    /// Resolve the text of the message a command replied to.
    async fn replied_to_message(
        &self,
        reply_to: &MessageRef,
    ) -> Result<Option<RepliedMessage>, BotError>;

    async fn current_user_id(&self) -> Result<UserId, BotError>;
}
