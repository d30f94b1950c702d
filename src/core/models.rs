use std::fmt;

/// Opaque account identifier as issued by the messaging backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

/// Opaque conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message that already exists in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub id: String,
}

impl MessageRef {
    pub fn new(chat_id: ChatId, id: impl Into<String>) -> Self {
        Self {
            chat_id,
            id: id.into(),
        }
    }
}

/// The message a command was sent in reply to, with its text resolved.
#[derive(Debug, Clone)]
pub struct RepliedMessage {
    pub message: MessageRef,
    pub text: String,
}

/// One entry of a conversation's member list.
#[derive(Debug, Clone, Default)]
pub struct Member {
    pub id: UserId,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub is_bot: bool,
    pub is_deleted: bool,
    pub is_self: bool,
}

/// The two long-running bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Tagging,
    Spam,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Tagging => f.write_str("tagging"),
            OperationKind::Spam => f.write_str("spam"),
        }
    }
}

/// A message or slash command as delivered by the backend listener.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: UserId,
    pub chat_id: ChatId,
    /// The message that carried the command; `None` for slash commands,
    /// which leave nothing in the conversation to delete.
    pub message: Option<MessageRef>,
    pub text: String,
    pub reply_to: Option<MessageRef>,
    pub is_group: bool,
}
