#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rollcall::commands::{Router, RouterSettings};
use rollcall::core::models::{
    ChatId, InboundMessage, Member, MessageRef, RepliedMessage, UserId,
};
use rollcall::engine::{Controller, Pacer};
use rollcall::errors::BotError;
use rollcall::messaging::{MemberStream, MessagingClient};
use tokio::time::Instant;

pub const ADMIN: &str = "UADMIN";
pub const SELF_ID: &str = "USELF";
pub const GROUP: &str = "C100";

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_to: Option<MessageRef>,
    pub at: Instant,
}

type SendHook = Box<dyn Fn(usize) + Send + Sync>;

/// In-memory [`MessagingClient`] that records everything the core does.
#[derive(Default)]
pub struct FakeClient {
    members: Mutex<Vec<Member>>,
    fail_members: Mutex<bool>,
    replies: Mutex<HashMap<String, String>>,
    failing_sends: Mutex<HashSet<usize>>,
    panicking_sends: Mutex<HashSet<usize>>,
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<MessageRef>>,
    attempts: Mutex<usize>,
    on_send: OnceLock<SendHook>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_members(members: Vec<Member>) -> Arc<Self> {
        let client = Self::default();
        *client.members.lock().unwrap() = members;
        Arc::new(client)
    }

    pub fn set_reply_text(&self, message_id: &str, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(message_id.to_string(), text.to_string());
    }

    /// Make the `n`th send attempt (1-based) fail.
    pub fn fail_send(&self, n: usize) {
        self.failing_sends.lock().unwrap().insert(n);
    }

    /// Make the `n`th send attempt (1-based) panic.
    pub fn panic_on_send(&self, n: usize) {
        self.panicking_sends.lock().unwrap().insert(n);
    }

    pub fn fail_member_listing(&self) {
        *self.fail_members.lock().unwrap() = true;
    }

    /// Run `hook` after every successful send, with the count sent so far.
    pub fn on_send(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        let _ = self.on_send.set(Box::new(hook));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for FakeClient {
    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        reply_to: Option<&MessageRef>,
    ) -> Result<MessageRef, BotError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        let panics = self.panicking_sends.lock().unwrap().contains(&attempt);
        if panics {
            panic!("send attempt {attempt} blew up");
        }
        if self.failing_sends.lock().unwrap().contains(&attempt) {
            return Err(BotError::SendError(format!("attempt {attempt} rejected")));
        }

        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                chat_id: chat.clone(),
                text: text.to_string(),
                reply_to: reply_to.cloned(),
                at: Instant::now(),
            });
            sent.len()
        };
        if let Some(hook) = self.on_send.get() {
            hook(count);
        }

        Ok(MessageRef::new(chat.clone(), format!("sent-{count}")))
    }

    fn enumerate_members<'a>(&'a self, _chat: &'a ChatId) -> MemberStream<'a> {
        if *self.fail_members.lock().unwrap() {
            return stream::once(async {
                Err(BotError::ApiError("member listing unavailable".to_string()))
            })
            .boxed();
        }
        let members = self.members.lock().unwrap().clone();
        stream::iter(members.into_iter().map(Ok)).boxed()
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), BotError> {
        self.deleted.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn replied_to_message(
        &self,
        reply_to: &MessageRef,
    ) -> Result<Option<RepliedMessage>, BotError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(&reply_to.id)
            .map(|text| RepliedMessage {
                message: reply_to.clone(),
                text: text.clone(),
            }))
    }

    async fn current_user_id(&self) -> Result<UserId, BotError> {
        Ok(UserId::new(SELF_ID))
    }
}

pub fn human(id: &str, handle: Option<&str>) -> Member {
    Member {
        id: UserId::new(id),
        display_name: Some(format!("Name {id}")),
        handle: handle.map(ToString::to_string),
        ..Member::default()
    }
}

pub fn humans(count: usize) -> Vec<Member> {
    (1..=count)
        .map(|i| human(&format!("U{i}"), Some(&format!("user{i}"))))
        .collect()
}

pub fn settings(min_cooldown: f64, max_cooldown: f64) -> RouterSettings {
    RouterSettings {
        admin_ids: HashSet::from([UserId::new(ADMIN)]),
        self_id: Some(UserId::new(SELF_ID)),
        pacer: Pacer::new(min_cooldown, max_cooldown),
        default_spam_count: 100,
        max_spam_count: 1000,
        debug_mode: false,
    }
}

pub fn router(client: Arc<FakeClient>, parallel: bool) -> (Router, Arc<Controller>) {
    router_with(client, parallel, settings(1.0, 3.0))
}

pub fn router_with(
    client: Arc<FakeClient>,
    parallel: bool,
    settings: RouterSettings,
) -> (Router, Arc<Controller>) {
    let controller = Controller::new(parallel);
    let router = Router::new(client, Arc::clone(&controller), settings);
    (router, controller)
}

pub fn message_from(sender: &str, id: &str, text: &str) -> InboundMessage {
    let chat_id = ChatId::new(GROUP);
    InboundMessage {
        sender: UserId::new(sender),
        chat_id: chat_id.clone(),
        message: Some(MessageRef::new(chat_id, id)),
        text: text.to_string(),
        reply_to: None,
        is_group: true,
    }
}

pub fn admin_message(id: &str, text: &str) -> InboundMessage {
    message_from(ADMIN, id, text)
}
