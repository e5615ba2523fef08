//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple threads
//! - Tracks a full submit -> progress -> finish round trip

use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stegosight::engine::MockEngine;
use stegosight::exec::{AnalyzeParams, ExecPool, OperationKind, TaskEvent, TaskParams, TaskSpec};
use stegosight::history::HistoryRecord;
use stegosight::{StateChange, StateManager, TaskOutcome};
use tokio::time::timeout;

fn analyze_spec(name: &str) -> TaskSpec {
    TaskSpec::new(
        vec![Utf8PathBuf::from(name)],
        TaskParams::Analyze(AnalyzeParams::default()),
    )
}

#[tokio::test]
async fn test_operation_started_event_emitted() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.begin_operation(OperationKind::Embed);

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");

    assert!(
        matches!(
            event,
            StateChange::OperationStarted {
                operation: OperationKind::Embed
            }
        ),
        "Expected OperationStarted event, got: {event:?}"
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();
    let mut rx3 = state.subscribe();

    state.begin_operation(OperationKind::Analyze);

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        assert!(matches!(event, StateChange::OperationStarted { .. }));
    }
}

#[test]
fn test_concurrent_updates_from_threads() {
    let state = Arc::new(StateManager::new());

    let mut threads = Vec::new();
    for operation in [
        OperationKind::Embed,
        OperationKind::Extract,
        OperationKind::Analyze,
        OperationKind::Neutralize,
    ] {
        let state = Arc::clone(&state);
        threads.push(std::thread::spawn(move || {
            state.begin_operation(operation);
            state.update_operation_progress(operation, Some(50), "halfway".to_string());
            state.finish_operation(
                operation,
                HistoryRecord::from_outcome(
                    &analyze_spec("x.png"),
                    &TaskOutcome::Cancelled,
                    Duration::ZERO,
                ),
            );
        }));
    }
    for thread in threads {
        thread.join().unwrap();
    }

    let snapshot = state.snapshot();
    assert!(!snapshot.any_busy());
    assert_eq!(snapshot.cancelled_ops, 4);
    assert_eq!(snapshot.history.len(), 4);
}

#[tokio::test]
async fn test_full_round_trip_through_pool_and_state() {
    // The same forwarding the GUI controller does: drain the task's event
    // stream into the state manager and verify the final state.
    let state = Arc::new(StateManager::new());
    let pool = ExecPool::with_limit(tokio::runtime::Handle::current(), 2);
    let engine = Arc::new(MockEngine::with_timing(3, Duration::from_millis(10)));

    let spec = analyze_spec("roundtrip.png");
    let operation = spec.operation();
    let mut handle = pool.submit(spec.clone(), engine);

    state.begin_operation(operation);
    assert!(state.read(|s| s.is_busy(operation)));

    let mut saw_progress = false;
    while let Some(event) = handle.next_event().await {
        match event {
            TaskEvent::Progress(update) => {
                saw_progress = true;
                state.update_operation_progress(
                    operation,
                    update.percent,
                    update.message.unwrap_or_default(),
                );
            }
            TaskEvent::Finished(outcome) => {
                let record =
                    HistoryRecord::from_outcome(&spec, &outcome, Duration::from_millis(30));
                state.finish_operation(operation, record);
            }
        }
    }

    assert!(saw_progress);
    let snapshot = state.snapshot();
    assert!(!snapshot.is_busy(operation));
    assert_eq!(snapshot.completed_ops, 1);
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history.entries()[0].status, "completed");
}

#[tokio::test]
async fn test_finished_event_carries_outcome_detail() {
    let state = Arc::new(StateManager::new());
    state.begin_operation(OperationKind::Analyze);

    let mut rx = state.subscribe();
    state.finish_operation(
        OperationKind::Analyze,
        HistoryRecord::from_outcome(
            &analyze_spec("y.png"),
            &TaskOutcome::Failed("bad header".to_string()),
            Duration::ZERO,
        ),
    );

    // Skip intermediate events until the terminal one arrives.
    loop {
        let event = timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        if let StateChange::OperationFinished {
            operation,
            status,
            message,
        } = event
        {
            assert_eq!(operation, OperationKind::Analyze);
            assert_eq!(status, "failed");
            assert_eq!(message, "bad header");
            break;
        }
    }

    assert_eq!(state.read(|s| s.failed_ops), 1);
}
