//! Command router: authorization, admission, and launching bulk runs.
//!
//! This module handles:
//! - Parsing each inbound message into a [`Command`]
//! - Authorization checks (unauthorized bulk/stop commands are deleted silently)
//! - Admission through the [`Controller`] and spawning the executor task
//! - The small inline commands (`/ping`, `/id`, `/stats`)

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::TryStreamExt;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::parser::{Command, parse_command};
use crate::core::auth::is_authorized;
use crate::core::config::AppConfig;
use crate::core::models::{InboundMessage, OperationKind, UserId};
use crate::engine::controller::{Admission, Controller, RunTicket};
use crate::engine::executor::{RunContext, RunReport};
use crate::engine::pacer::Pacer;
use crate::engine::spam::{SpamPlan, SpamRefusal, run_spam};
use crate::engine::tagging::{TagRequest, run_tag_all};
use crate::messaging::MessagingClient;

/// Static inputs the router needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub admin_ids: HashSet<UserId>,
    pub self_id: Option<UserId>,
    pub pacer: Pacer,
    pub default_spam_count: u32,
    pub max_spam_count: u32,
    pub debug_mode: bool,
}

impl RouterSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, self_id: UserId) -> Self {
        Self {
            admin_ids: config.admin_ids.clone(),
            self_id: Some(self_id),
            pacer: Pacer::new(config.min_cooldown, config.max_cooldown),
            default_spam_count: config.default_spam_count,
            max_spam_count: config.max_spam_count,
            debug_mode: config.debug_mode,
        }
    }
}

/// Member counts reported by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberStats {
    pub total: usize,
    pub users: usize,
    pub bots: usize,
    pub deleted: usize,
}

/// What [`Router::dispatch`] did with a message.
#[derive(Debug)]
pub enum Dispatch {
    /// Not a command, or a command that does not apply here.
    Ignored,
    Handled,
    Stats(MemberStats),
    Unauthorized,
    /// Another operation holds the single-flight slot.
    Rejected { active: OperationKind },
    Refused(SpamRefusal),
    /// Kinds that were signalled; empty when nothing was running.
    StopRequested(Vec<OperationKind>),
    /// Resolves once the run ended and its slot was released.
    Started(JoinHandle<Option<RunReport>>),
}

pub struct Router {
    client: Arc<dyn MessagingClient>,
    controller: Arc<Controller>,
    settings: RouterSettings,
}

impl Router {
    #[must_use]
    pub fn new(
        client: Arc<dyn MessagingClient>,
        controller: Arc<Controller>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            client,
            controller,
            settings,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Handle one inbound message end to end.
    #[tracing::instrument(level = "debug", skip_all, fields(chat = %message.chat_id))]
    pub async fn dispatch(&self, message: InboundMessage) -> Dispatch {
        if self.settings.debug_mode {
            debug!(
                "Chat {} | User {} | Message: {}",
                message.chat_id, message.sender, message.text
            );
        }

        let Some(command) = parse_command(&message.text) else {
            return Dispatch::Ignored;
        };
        let authorized = is_authorized(
            &message.sender,
            &self.settings.admin_ids,
            self.settings.self_id.as_ref(),
        );

        match command {
            Command::Ping => self.handle_ping(&message, authorized).await,
            Command::Id => self.handle_id(&message, authorized).await,
            Command::Stats => self.handle_stats(&message, authorized).await,
            Command::TagAll { text } => self.handle_tagall(&message, authorized, text).await,
            Command::Spam { count, text } => {
                self.handle_spam(&message, authorized, count, &text).await
            }
            Command::Stop => self.handle_stop(&message, authorized).await,
        }
    }

    async fn delete_trigger(&self, message: &InboundMessage) {
        let Some(trigger) = &message.message else {
            return;
        };
        if let Err(e) = self.client.delete_message(trigger).await {
            warn!("Failed to delete command message {}: {}", trigger.id, e);
        }
    }

    async fn handle_ping(&self, message: &InboundMessage, authorized: bool) -> Dispatch {
        if !authorized {
            debug!("Ignoring ping from non-admin {}", message.sender);
            return Dispatch::Ignored;
        }
        info!("Ping command received from {}", message.sender);
        self.delete_trigger(message).await;
        Dispatch::Handled
    }

    async fn handle_id(&self, message: &InboundMessage, authorized: bool) -> Dispatch {
        if !authorized {
            debug!("Ignoring id from non-admin {}", message.sender);
            return Dispatch::Ignored;
        }
        info!(
            "ID command - Chat: {}, User: {}",
            message.chat_id, message.sender
        );
        self.delete_trigger(message).await;
        Dispatch::Handled
    }

    async fn handle_stats(&self, message: &InboundMessage, authorized: bool) -> Dispatch {
        if !authorized {
            debug!("Ignoring stats from non-admin {}", message.sender);
            return Dispatch::Ignored;
        }
        self.delete_trigger(message).await;

        let mut stats = MemberStats::default();
        let mut members = self.client.enumerate_members(&message.chat_id);
        loop {
            match members.try_next().await {
                Ok(Some(member)) => {
                    stats.total += 1;
                    if member.is_bot {
                        stats.bots += 1;
                    } else if member.is_deleted {
                        stats.deleted += 1;
                    } else {
                        stats.users += 1;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Stats error in {}: {}", message.chat_id, e);
                    return Dispatch::Handled;
                }
            }
        }

        info!(
            "Stats - Chat: {}, Total: {}, Users: {}, Bots: {}, Deleted: {}",
            message.chat_id, stats.total, stats.users, stats.bots, stats.deleted
        );
        Dispatch::Stats(stats)
    }

    async fn handle_tagall(
        &self,
        message: &InboundMessage,
        authorized: bool,
        text: Option<String>,
    ) -> Dispatch {
        if !authorized {
            debug!("User {} is not admin", message.sender);
            self.delete_trigger(message).await;
            return Dispatch::Unauthorized;
        }
        if !message.is_group {
            debug!("Chat {} is not a group", message.chat_id);
            self.delete_trigger(message).await;
            return Dispatch::Ignored;
        }

        let ticket = match self.controller.admit(OperationKind::Tagging) {
            Admission::Admitted(ticket) => ticket,
            Admission::Rejected { active } => {
                warn!(
                    "Another command ({}) is already active. Ignoring tagall from {}",
                    active, message.sender
                );
                self.delete_trigger(message).await;
                return Dispatch::Rejected { active };
            }
        };
        self.delete_trigger(message).await;

        info!(
            "Tagall command received in chat {} with text: '{}'",
            message.chat_id,
            text.as_deref().unwrap_or_default()
        );

        let reply_text = match &message.reply_to {
            Some(reply_to) => match self.client.replied_to_message(reply_to).await {
                Ok(replied) => replied.map(|r| r.text),
                Err(e) => {
                    error!("Error getting reply message: {}", e);
                    None
                }
            },
            None => None,
        };
        let request = TagRequest {
            argument: text,
            reply_to: message.reply_to.clone(),
            reply_text,
        };

        let ctx = self.run_context(message, ticket);
        Dispatch::Started(self.launch(ctx, |ctx| run_tag_all(ctx, request)))
    }

    async fn handle_spam(
        &self,
        message: &InboundMessage,
        authorized: bool,
        count: Option<u64>,
        text: &str,
    ) -> Dispatch {
        if !authorized {
            debug!("User {} is not admin", message.sender);
            self.delete_trigger(message).await;
            return Dispatch::Unauthorized;
        }

        let plan = match SpamPlan::resolve(
            count,
            text,
            message.reply_to.clone(),
            self.settings.default_spam_count,
            self.settings.max_spam_count,
        ) {
            Ok(plan) => plan,
            Err(refusal) => {
                warn!("{}", refusal);
                self.delete_trigger(message).await;
                return Dispatch::Refused(refusal);
            }
        };

        let ticket = match self.controller.admit(OperationKind::Spam) {
            Admission::Admitted(ticket) => ticket,
            Admission::Rejected { active } => {
                warn!(
                    "Another command ({}) is already active. Ignoring spam from {}",
                    active, message.sender
                );
                self.delete_trigger(message).await;
                return Dispatch::Rejected { active };
            }
        };
        self.delete_trigger(message).await;

        info!(
            "Spam command received: {} times with text: '{}'",
            plan.count, plan.text
        );

        let ctx = self.run_context(message, ticket);
        Dispatch::Started(self.launch(ctx, |ctx| run_spam(ctx, plan)))
    }

    async fn handle_stop(&self, message: &InboundMessage, authorized: bool) -> Dispatch {
        if !authorized {
            self.delete_trigger(message).await;
            return Dispatch::Unauthorized;
        }

        let stopping = self.controller.request_cancel();
        if !stopping.is_empty() {
            let kinds: Vec<String> = stopping.iter().map(ToString::to_string).collect();
            info!(
                "Stop command received from {}. Stopping {}...",
                message.sender,
                kinds.join(", ")
            );
        }
        self.delete_trigger(message).await;
        Dispatch::StopRequested(stopping)
    }

    fn run_context(&self, message: &InboundMessage, ticket: RunTicket) -> RunContext {
        RunContext {
            correlation_id: Uuid::new_v4().to_string(),
            client: Arc::clone(&self.client),
            chat_id: message.chat_id.clone(),
            pacer: self.settings.pacer,
            ticket,
        }
    }

    /// Spawn the executor and a supervisor that awaits it.
    ///
    /// The supervisor logs how the run ended and resets the controller again,
    /// which is a no-op unless the run never got to drop its ticket.
    fn launch<F, Fut>(&self, ctx: RunContext, run: F) -> JoinHandle<Option<RunReport>>
    where
        F: FnOnce(RunContext) -> Fut,
        Fut: Future<Output = RunReport> + Send + 'static,
    {
        let run_id = ctx.ticket.run_id();
        let kind = ctx.ticket.kind();
        let span = info_span!("bulk_run", correlation_id = %ctx.correlation_id, %kind);

        let task = tokio::spawn(run(ctx).instrument(span));
        self.controller.attach(run_id, task.abort_handle());

        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            let report = match task.await {
                Ok(report) => {
                    info!("{} run {} {}", report.kind, report.run_id, report.outcome);
                    Some(report)
                }
                Err(e) if e.is_cancelled() => {
                    info!("{} task was cancelled", kind);
                    None
                }
                Err(e) => {
                    error!("{} task error: {}", kind, e);
                    None
                }
            };
            controller.reset(run_id);
            report
        })
    }
}
