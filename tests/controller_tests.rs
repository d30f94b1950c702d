use std::time::Duration;

use rollcall::core::models::OperationKind;
use rollcall::engine::{Admission, Controller, RunTicket};

fn admitted(admission: Admission) -> RunTicket {
    match admission {
        Admission::Admitted(ticket) => ticket,
        Admission::Rejected { active } => panic!("unexpected rejection, {active} active"),
    }
}

#[test]
fn second_admission_is_rejected_without_touching_the_first() {
    let controller = Controller::new(false);
    let ticket = admitted(controller.admit(OperationKind::Spam));

    match controller.admit(OperationKind::Tagging) {
        Admission::Rejected { active } => assert_eq!(active, OperationKind::Spam),
        Admission::Admitted(_) => panic!("second run must be rejected"),
    }

    assert_eq!(controller.active_kind(), Some(OperationKind::Spam));
    assert_eq!(controller.active_count(), 1);
    assert!(!ticket.is_cancelled());
    assert!(controller.is_running(None));
    assert!(controller.is_running(Some(OperationKind::Spam)));
    assert!(!controller.is_running(Some(OperationKind::Tagging)));
}

#[test]
fn dropping_the_ticket_returns_to_idle() {
    let controller = Controller::new(false);
    let ticket = admitted(controller.admit(OperationKind::Tagging));
    assert!(controller.is_running(None));

    drop(ticket);

    assert!(!controller.is_running(None));
    assert_eq!(controller.active_kind(), None);
    admitted(controller.admit(OperationKind::Spam));
}

#[test]
fn reset_is_idempotent() {
    let controller = Controller::new(false);
    let ticket = admitted(controller.admit(OperationKind::Spam));
    let run_id = ticket.run_id();

    controller.reset(run_id);
    controller.reset(run_id);
    assert_eq!(controller.active_count(), 0);

    // The ticket's own reset afterwards must not disturb a newer run.
    let newer = admitted(controller.admit(OperationKind::Tagging));
    drop(ticket);
    assert_eq!(controller.active_kind(), Some(OperationKind::Tagging));
    drop(newer);
}

#[test]
fn cancel_signals_the_running_operation() {
    let controller = Controller::new(false);
    let ticket = admitted(controller.admit(OperationKind::Tagging));

    let stopped = controller.request_cancel();

    assert_eq!(stopped, vec![OperationKind::Tagging]);
    assert!(ticket.is_cancelled());
    assert!(controller.is_cancel_requested());
}

#[test]
fn cancel_while_idle_is_a_no_op() {
    let controller = Controller::new(false);

    assert!(controller.request_cancel().is_empty());
    assert!(!controller.is_cancel_requested());

    let ticket = admitted(controller.admit(OperationKind::Spam));
    assert!(!ticket.is_cancelled());
}

#[test]
fn parallel_mode_admits_everything_and_cancels_all() {
    let controller = Controller::new(true);
    let first = admitted(controller.admit(OperationKind::Spam));
    let second = admitted(controller.admit(OperationKind::Spam));
    let third = admitted(controller.admit(OperationKind::Tagging));

    assert_eq!(controller.active_count(), 3);
    assert!(!controller.is_running(None));
    assert_ne!(first.run_id(), second.run_id());

    let stopped = controller.request_cancel();
    assert_eq!(stopped.len(), 3);
    assert!(first.is_cancelled() && second.is_cancelled() && third.is_cancelled());

    drop(second);
    assert_eq!(controller.active_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_attached_tasks() {
    let controller = Controller::new(false);
    let ticket = admitted(controller.admit(OperationKind::Spam));
    let run_id = ticket.run_id();

    let task = tokio::spawn(async move {
        let _ticket = ticket;
        tokio::time::sleep(Duration::from_secs(3600)).await;
    });
    controller.attach(run_id, task.abort_handle());

    controller.shutdown();

    let err = task.await.expect_err("task should be aborted");
    assert!(err.is_cancelled());
    assert_eq!(controller.active_count(), 0);
}
