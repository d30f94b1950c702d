//! Single-flight admission and cooperative cancellation for bulk operations.
//!
//! In the default mode at most one bulk operation runs process-wide; a second
//! request is rejected, whatever its kind. With parallel mode enabled every
//! request is admitted and gets its own state record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::models::OperationKind;

pub type RunId = u64;

/// State of one running bulk operation.
#[derive(Debug)]
struct OperationState {
    run_id: RunId,
    kind: OperationKind,
    cancel: CancellationToken,
    handle: Option<AbortHandle>,
}

#[derive(Debug)]
pub enum Admission {
    Admitted(RunTicket),
    Rejected { active: OperationKind },
}

#[derive(Debug)]
pub struct Controller {
    parallel: bool,
    next_run_id: AtomicU64,
    runs: Mutex<Vec<OperationState>>,
}

impl Controller {
    #[must_use]
    pub fn new(parallel: bool) -> Arc<Self> {
        Arc::new(Self {
            parallel,
            next_run_id: AtomicU64::new(1),
            runs: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    fn runs(&self) -> MutexGuard<'_, Vec<OperationState>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to start an operation of `kind`.
    ///
    /// A rejection leaves the running operation untouched.
    pub fn admit(self: &Arc<Self>, kind: OperationKind) -> Admission {
        let mut runs = self.runs();
        if !self.parallel {
            if let Some(active) = runs.first() {
                return Admission::Rejected { active: active.kind };
            }
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        runs.push(OperationState {
            run_id,
            kind,
            cancel: cancel.clone(),
            handle: None,
        });
        debug!(run_id, %kind, "operation admitted");

        Admission::Admitted(RunTicket {
            run_id,
            kind,
            cancel,
            controller: Arc::clone(self),
        })
    }

    /// Record the task executing `run_id` so [`Controller::shutdown`] can abort it.
    pub fn attach(&self, run_id: RunId, handle: AbortHandle) {
        if let Some(run) = self.runs().iter_mut().find(|run| run.run_id == run_id) {
            run.handle = Some(handle);
        }
    }

    /// Signal every running operation to stop at its next checkpoint.
    ///
    /// Returns the kinds that were signalled; empty when idle.
    pub fn request_cancel(&self) -> Vec<OperationKind> {
        let runs = self.runs();
        if runs.is_empty() {
            info!("Stop requested but no command is active");
            return Vec::new();
        }
        let mut signalled = Vec::with_capacity(runs.len());
        for run in runs.iter() {
            run.cancel.cancel();
            signalled.push(run.kind);
        }
        signalled
    }

    /// Return `run_id` to idle. Unknown or already-reset runs are ignored.
    pub fn reset(&self, run_id: RunId) {
        let mut runs = self.runs();
        let before = runs.len();
        runs.retain(|run| run.run_id != run_id);
        if runs.len() != before {
            debug!(run_id, "operation state reset");
        }
    }

    /// Whether a newly arriving command must be turned away.
    ///
    /// With `kind` set the busy operation must also be of that kind. Always
    /// false in parallel mode, where nothing is gated.
    #[must_use]
    pub fn is_running(&self, kind: Option<OperationKind>) -> bool {
        if self.parallel {
            return false;
        }
        match (self.runs().first(), kind) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(active), Some(kind)) => active.kind == kind,
        }
    }

    /// Kind of the operation currently holding the slot.
    #[must_use]
    pub fn active_kind(&self) -> Option<OperationKind> {
        self.runs().first().map(|run| run.kind)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.runs().len()
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.runs().iter().any(|run| run.cancel.is_cancelled())
    }

    /// Cancel and abort everything that is still running.
    pub fn shutdown(&self) {
        let handles: Vec<AbortHandle> = {
            let runs = self.runs();
            for run in runs.iter() {
                run.cancel.cancel();
            }
            runs.iter().filter_map(|run| run.handle.clone()).collect()
        };
        if !handles.is_empty() {
            info!(count = handles.len(), "Aborting running operations");
        }
        for handle in handles {
            handle.abort();
        }
    }
}

/// Proof of admission, owned by the executing task.
///
/// Dropping the ticket resets the controller for this run, whichever way the
/// run ends.
#[derive(Debug)]
pub struct RunTicket {
    run_id: RunId,
    kind: OperationKind,
    cancel: CancellationToken,
    controller: Arc<Controller>,
}

impl RunTicket {
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.controller.reset(self.run_id);
    }
}
