// Worker wrapper: runs one task on the shared pool and reports back.
//
// The wrapper owns the only sender for a task's event channel, so the
// exactly-once terminal guarantee is structural: every exit path sends one
// Finished event and then drops the sender. Engine errors and panics are
// converted into Failed outcomes; they never reach the runtime's panic
// handler and never affect other tasks sharing the pool.

use crate::engine::{EngineError, OperationOutput, StegoEngine};
use crate::exec::{CancelToken, TaskParams, TaskSpec};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

/// Progress report from a running task.
///
/// `percent` is `None` while the task cannot quantify its progress
/// (indeterminate). Events from one task arrive in emission order; there is
/// no ordering across tasks.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressUpdate {
    pub percent: Option<u8>,
    pub message: Option<String>,
}

/// Terminal outcome of a task. Exactly one is delivered per submission.
#[derive(Clone, Debug)]
pub enum TaskOutcome {
    Completed(OperationOutput),
    Failed(String),
    Cancelled,
}

impl TaskOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed(_) => "completed",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Cancelled => "cancelled",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            TaskOutcome::Completed(output) => output.summary(),
            TaskOutcome::Failed(message) => message.clone(),
            TaskOutcome::Cancelled => "Cancelled by user".to_string(),
        }
    }
}

/// Event stream element: zero or more Progress entries, then one Finished.
#[derive(Clone, Debug)]
pub enum TaskEvent {
    Progress(ProgressUpdate),
    Finished(TaskOutcome),
}

/// Handle engines use to publish progress. Send failures are ignored - a
/// dropped receiver just means nobody is watching any more.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self { tx }
    }

    pub fn report(&self, percent: u8, message: impl Into<String>) {
        let _ = self.tx.send(TaskEvent::Progress(ProgressUpdate {
            percent: Some(percent.min(100)),
            message: Some(message.into()),
        }));
    }

    pub fn report_indeterminate(&self, message: impl Into<String>) {
        let _ = self.tx.send(TaskEvent::Progress(ProgressUpdate {
            percent: None,
            message: Some(message.into()),
        }));
    }
}

/// What the submitter gets back: the cancellation token and the
/// single-consumer event stream for this task.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancelToken,
    pub events: mpsc::UnboundedReceiver<TaskEvent>,
}

impl TaskHandle {
    pub(crate) fn new(token: CancelToken, events: mpsc::UnboundedReceiver<TaskEvent>) -> Self {
        Self { token, events }
    }

    /// Request cancellation of this task. Idempotent; a no-op once the task
    /// has reached its terminal state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A clone of the task's cancellation token, e.g. for composing an
    /// external timeout that calls `cancel()` after a deadline.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Drain the stream and return the terminal outcome, discarding progress.
    pub async fn join(mut self) -> TaskOutcome {
        while let Some(event) = self.events.recv().await {
            if let TaskEvent::Finished(outcome) = event {
                return outcome;
            }
        }
        // Unreachable as long as the wrapper upholds its contract; treat a
        // closed channel without a terminal event as a failure.
        TaskOutcome::Failed("task event channel closed without a terminal event".to_string())
    }
}

/// Body of one pool task. Waits for an execution slot (racing cancellation so
/// queued work can abort without starting), runs the engine capability, and
/// delivers the single terminal event.
pub(crate) async fn run_task(
    task: TaskSpec,
    engine: Arc<dyn StegoEngine>,
    token: CancelToken,
    tx: mpsc::UnboundedSender<TaskEvent>,
    permits: Arc<Semaphore>,
) {
    let operation = task.operation();
    let subject = task
        .primary_input()
        .map(|p| p.to_string())
        .unwrap_or_default();

    let _permit = tokio::select! {
        permit = permits.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                // Pool shut down while this task was queued; abandon it.
                tracing::debug!(%operation, "pool closed before task started");
                let _ = tx.send(TaskEvent::Finished(TaskOutcome::Cancelled));
                return;
            }
        },
        _ = token.cancelled() => {
            tracing::info!(%operation, %subject, "task cancelled while queued");
            let _ = tx.send(TaskEvent::Finished(TaskOutcome::Cancelled));
            return;
        }
    };

    tracing::info!(%operation, %subject, "task started");

    let progress = ProgressSink::new(tx.clone());
    let inner_engine = Arc::clone(&engine);
    let inner_token = token.clone();
    let inner_progress = progress.clone();

    // The engine runs in its own spawned task so a panicking implementation
    // surfaces as a JoinError here instead of killing the wrapper.
    let joined = tokio::spawn(async move {
        dispatch(
            inner_engine.as_ref(),
            &task,
            &inner_token,
            &inner_progress,
        )
        .await
    })
    .await;

    let outcome = match joined {
        Ok(Ok(output)) => {
            if token.is_cancelled() {
                TaskOutcome::Cancelled
            } else {
                TaskOutcome::Completed(output)
            }
        }
        Ok(Err(EngineError::Cancelled)) => TaskOutcome::Cancelled,
        Ok(Err(err)) => TaskOutcome::Failed(err.to_string()),
        Err(join_err) if join_err.is_panic() => {
            let panic = join_err.into_panic();
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "engine panicked".to_string());
            tracing::error!(%operation, %subject, "engine panicked: {message}");
            TaskOutcome::Failed(format!("engine panicked: {message}"))
        }
        Err(_) => TaskOutcome::Failed("engine task aborted".to_string()),
    };

    tracing::info!(%operation, %subject, status = outcome.status_label(), "task finished");
    let _ = tx.send(TaskEvent::Finished(outcome));
    // Sender, token, and engine reference drop here; later cancel() calls on
    // the caller's token are no-ops.
}

async fn dispatch(
    engine: &dyn StegoEngine,
    task: &TaskSpec,
    cancel: &CancelToken,
    progress: &ProgressSink,
) -> Result<OperationOutput, EngineError> {
    match task.params() {
        TaskParams::Embed(params) => engine.embed(task.inputs(), params, cancel, progress).await,
        TaskParams::Extract(params) => {
            engine.extract(task.inputs(), params, cancel, progress).await
        }
        TaskParams::Analyze(params) => {
            engine.analyze(task.inputs(), params, cancel, progress).await
        }
        TaskParams::Neutralize(params) => {
            engine
                .neutralize(task.inputs(), params, cancel, progress)
                .await
        }
    }
}
