//! The loop shared by every bulk operation: act on each target in order,
//! pace between targets, and stop at the first cancellation checkpoint.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::controller::RunTicket;
use super::pacer::Pacer;
use crate::core::models::{ChatId, OperationKind};
use crate::errors::BotError;
use crate::messaging::MessagingClient;

/// Per-target behaviour plugged into [`run_bulk`].
#[async_trait]
pub trait BulkAction: Send + Sync {
    type Target: Send + Sync;

    fn kind(&self) -> OperationKind;

    /// Perform the action for one target. An error only skips this target.
    async fn act(&self, index: usize, target: &Self::Target) -> Result<(), BotError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every target was processed; `sent` counts the successful ones.
    Completed { sent: usize, total: usize },
    /// A stop request was honoured after `sent` successful targets.
    Stopped { sent: usize, total: usize },
    /// The run could not proceed, e.g. the target listing failed.
    Failed { sent: usize, reason: String },
}

impl RunOutcome {
    #[must_use]
    pub fn sent(&self) -> usize {
        match self {
            RunOutcome::Completed { sent, .. }
            | RunOutcome::Stopped { sent, .. }
            | RunOutcome::Failed { sent, .. } => *sent,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed { sent, total } => write!(f, "completed {sent}/{total}"),
            RunOutcome::Stopped { sent, .. } => write!(f, "stopped after {sent}"),
            RunOutcome::Failed { sent, reason } => write!(f, "failed after {sent}: {reason}"),
        }
    }
}

/// Final result of one bulk run, as returned to whoever awaited it.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub kind: OperationKind,
    pub outcome: RunOutcome,
    pub failed: usize,
}

/// Everything an admitted run needs. Owns the [`RunTicket`], so the
/// controller slot is released when the context is dropped.
pub struct RunContext {
    pub correlation_id: String,
    pub client: Arc<dyn MessagingClient>,
    pub chat_id: ChatId,
    pub pacer: Pacer,
    pub ticket: RunTicket,
}

impl RunContext {
    #[must_use]
    pub fn report(&self, outcome: RunOutcome, failed: usize) -> RunReport {
        RunReport {
            run_id: self.correlation_id.clone(),
            kind: self.ticket.kind(),
            outcome,
            failed,
        }
    }
}

/// Outcome of [`run_bulk`] plus the number of targets whose action failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResult {
    pub outcome: RunOutcome,
    pub failed: usize,
}

impl BulkResult {
    fn new(outcome: RunOutcome, failed: usize) -> Self {
        Self { outcome, failed }
    }
}

fn should_log_progress(sent: usize, total: usize) -> bool {
    total <= 10 || sent % 10 == 0 || sent == total
}

/// Drive `action` over `targets`.
///
/// Targets are handled strictly in order, one at a time. The pacer runs
/// between consecutive targets, never after the last one. Cancellation is
/// honoured before each target and during each cooldown; an in-flight action
/// always completes first.
pub async fn run_bulk<A, I>(
    action: &A,
    targets: I,
    pacer: &Pacer,
    cancel: &CancellationToken,
) -> BulkResult
where
    A: BulkAction,
    I: IntoIterator<Item = A::Target>,
    I::IntoIter: ExactSizeIterator + Send,
{
    let kind = action.kind();
    let targets = targets.into_iter();
    let total = targets.len();
    let mut sent = 0;
    let mut failed = 0;

    for (index, target) in targets.enumerate() {
        if index > 0 && !pacer.wait(cancel).await {
            info!("{} stopped during cooldown after {}", kind, sent);
            return BulkResult::new(RunOutcome::Stopped { sent, total }, failed);
        }
        if cancel.is_cancelled() {
            info!("{} stopped after {}", kind, sent);
            return BulkResult::new(RunOutcome::Stopped { sent, total }, failed);
        }

        debug!("Processing {} target {}/{}", kind, index + 1, total);
        match action.act(index, &target).await {
            Ok(()) => {
                sent += 1;
                if should_log_progress(sent, total) {
                    info!("{} progress: {}/{}", kind, sent, total);
                }
            }
            Err(e) => {
                failed += 1;
                error!("{} target {} failed: {}", kind, index + 1, e);
            }
        }
    }

    info!("{} completed: {}/{}", kind, sent, total);
    BulkResult::new(RunOutcome::Completed { sent, total }, failed)
}
