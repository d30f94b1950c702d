//! Slack API client module
//!
//! Implements [`MessagingClient`] for a Slack account. Read calls are retried
//! with exponential backoff; posts are sent once.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::SlackApiChatDeleteRequest;
use slack_morphism::{SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackTs};
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::{debug, warn};

use crate::core::models::{ChatId, Member, MessageRef, RepliedMessage, UserId};
use crate::errors::BotError;
use crate::messaging::{MemberStream, MessagingClient};

const SLACK_API_BASE: &str = "https://slack.com/api";
const MEMBERS_PAGE_LIMIT: &str = "200";

// None when the connector cannot be built; call sites report a BotError.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    ok: bool,
    #[serde(default)]
    members: Vec<String>,
    response_metadata: Option<ResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserProfile {
    display_name: Option<String>,
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    name: Option<String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    ok: bool,
    user: Option<UserRecord>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    ts: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<ThreadMessage>,
    error: Option<String>,
}

struct MembersPage {
    members: Vec<String>,
    next_cursor: Option<String>,
}

enum PageCursor {
    Start,
    Next(String),
    Done,
}

fn check_ok(method: &str, ok: bool, error: Option<&str>) -> Result<(), BotError> {
    if ok {
        Ok(())
    } else {
        Err(BotError::ApiError(format!(
            "{method} error: {}",
            error.unwrap_or("unknown")
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn member_from_record(record: UserRecord, self_id: Option<&UserId>) -> Member {
    let id = UserId::new(record.id);
    let display_name =
        non_empty(record.profile.display_name).or_else(|| non_empty(record.profile.real_name));
    Member {
        is_self: self_id.is_some_and(|me| *me == id),
        id,
        display_name,
        handle: non_empty(record.name),
        is_bot: record.is_bot,
        is_deleted: record.deleted,
    }
}

/// Build the JSON payload for `chat.postMessage`.
#[must_use]
fn build_post_payload(channel: &str, text: &str, thread_ts: Option<&str>) -> Value {
    let mut payload = json!({
        "channel": channel,
        "text": text,
        "link_names": true,
    });

    if let Some(ts) = thread_ts {
        payload["thread_ts"] = Value::String(ts.to_string());
    }

    payload
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    self_id: OnceLock<UserId>,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            self_id: OnceLock::new(),
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, BotError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BotError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);

        Retry::spawn(strategy, operation).await
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BotError> {
        let resp = HTTP_CLIENT
            .get(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.token.token_value.0)
            .query(query)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::ApiError(format!(
                "{method} HTTP {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| BotError::GeneralError(format!("{method} JSON parse error: {e}")))
    }

    /// # Errors
    ///
    /// Returns an error if `auth.test` fails.
    pub async fn get_user_id(&self) -> Result<String, BotError> {
        self.with_retry(|| async {
            let session = SLACK_CLIENT
                .as_ref()
                .ok_or_else(|| {
                    BotError::GeneralError("Slack HTTP connector not initialized".to_string())
                })?
                .open_session(&self.token);

            let test_resp = session.auth_test().await?;
            Ok(test_resp.user_id.0)
        })
        .await
    }

    async fn members_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<MembersPage, BotError> {
        self.with_retry(|| async {
            let mut query = vec![("channel", channel_id), ("limit", MEMBERS_PAGE_LIMIT)];
            if let Some(cursor) = cursor {
                query.push(("cursor", cursor));
            }
            let resp: MembersResponse = self.api_get("conversations.members", &query).await?;
            check_ok("conversations.members", resp.ok, resp.error.as_deref())?;

            Ok(MembersPage {
                members: resp.members,
                next_cursor: resp.response_metadata.and_then(|m| non_empty(m.next_cursor)),
            })
        })
        .await
    }

    async fn next_members_page(
        &self,
        chat: &ChatId,
        cursor: PageCursor,
    ) -> Result<Option<(Vec<String>, PageCursor)>, BotError> {
        let after = match cursor {
            PageCursor::Done => return Ok(None),
            PageCursor::Start => None,
            PageCursor::Next(next) => Some(next),
        };

        let page = self.members_page(&chat.0, after.as_deref()).await?;
        debug!("Fetched {} member ids from {}", page.members.len(), chat);
        let next = match page.next_cursor {
            Some(next) => PageCursor::Next(next),
            None => PageCursor::Done,
        };
        Ok(Some((page.members, next)))
    }

    async fn member_info(&self, user_id: &str) -> Result<Member, BotError> {
        self.with_retry(|| async {
            let resp: UserInfoResponse = self.api_get("users.info", &[("user", user_id)]).await?;
            check_ok("users.info", resp.ok, resp.error.as_deref())?;
            let record = resp
                .user
                .ok_or_else(|| BotError::ApiError("users.info returned no user".to_string()))?;
            Ok(member_from_record(record, self.self_id.get()))
        })
        .await
    }
}

#[async_trait]
impl MessagingClient for SlackClient {
    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        reply_to: Option<&MessageRef>,
    ) -> Result<MessageRef, BotError> {
        // Single attempt; a retried post could land twice.
        let payload = build_post_payload(&chat.0, text, reply_to.map(|r| r.id.as_str()));
        let resp = HTTP_CLIENT
            .post(format!("{SLACK_API_BASE}/chat.postMessage"))
            .bearer_auth(&self.token.token_value.0)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BotError::SendError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BotError::SendError(format!(
                "chat.postMessage HTTP {}",
                resp.status()
            )));
        }

        let body: PostMessageResponse = resp.json().await.map_err(|e| {
            BotError::SendError(format!("chat.postMessage JSON parse error: {e}"))
        })?;
        if !body.ok {
            return Err(BotError::SendError(format!(
                "chat.postMessage error: {}",
                body.error.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(MessageRef::new(chat.clone(), body.ts.unwrap_or_default()))
    }

    fn enumerate_members<'a>(&'a self, chat: &'a ChatId) -> MemberStream<'a> {
        stream::try_unfold(PageCursor::Start, move |cursor| {
            self.next_members_page(chat, cursor)
        })
        .map_ok(|ids| stream::iter(ids.into_iter().map(Ok::<String, BotError>)))
        .try_flatten()
        .and_then(move |user_id| async move { self.member_info(&user_id).await })
        .boxed()
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), BotError> {
        self.with_retry(|| async {
            let session = SLACK_CLIENT
                .as_ref()
                .ok_or_else(|| {
                    BotError::GeneralError("Slack HTTP connector not initialized".to_string())
                })?
                .open_session(&self.token);

            let delete_req = SlackApiChatDeleteRequest::new(
                SlackChannelId(message.chat_id.0.clone()),
                SlackTs(message.id.clone()),
            );

            session.chat_delete(&delete_req).await?;
            Ok(())
        })
        .await
    }

    async fn replied_to_message(
        &self,
        reply_to: &MessageRef,
    ) -> Result<Option<RepliedMessage>, BotError> {
        self.with_retry(|| async {
            let query = [
                ("channel", reply_to.chat_id.0.as_str()),
                ("ts", reply_to.id.as_str()),
                ("limit", "1"),
                ("inclusive", "true"),
            ];
            let resp: RepliesResponse = self.api_get("conversations.replies", &query).await?;
            check_ok("conversations.replies", resp.ok, resp.error.as_deref())?;

            Ok(resp
                .messages
                .into_iter()
                .find(|m| m.ts == reply_to.id)
                .map(|m| RepliedMessage {
                    message: reply_to.clone(),
                    text: m.text,
                }))
        })
        .await
    }

    async fn current_user_id(&self) -> Result<UserId, BotError> {
        if let Some(id) = self.self_id.get() {
            return Ok(id.clone());
        }
        let id = UserId::new(self.get_user_id().await?);
        Ok(self.self_id.get_or_init(|| id).clone())
    }
}
