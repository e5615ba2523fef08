// Shared execution pool: process-wide bound on concurrently running tasks.
//
// Every view submits through the same pool, so four busy views cannot
// oversubscribe the host. Admission is FIFO (tokio's semaphore is fair);
// once admitted, tasks run concurrently. The pool imposes no deadlines -
// callers compose timeouts by cancelling a task's token.

use crate::engine::StegoEngine;
use crate::exec::worker::{TaskHandle, run_task};
use crate::exec::{CancelToken, TaskSpec};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

/// Bound on concurrently executing tasks, shared by all views.
///
/// Construct one at composition time and share it (`Clone` is cheap - clones
/// refer to the same permit pool). Default capacity is the host's available
/// parallelism.
#[derive(Clone, Debug)]
pub struct ExecPool {
    handle: tokio::runtime::Handle,
    permits: Arc<Semaphore>,
    max_tasks: usize,
}

impl ExecPool {
    /// Pool sized to the host's available parallelism.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        let max_tasks = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::with_limit(handle, max_tasks)
    }

    /// Pool with an explicit concurrency limit (minimum 1).
    pub fn with_limit(handle: tokio::runtime::Handle, max_tasks: usize) -> Self {
        let max_tasks = max_tasks.max(1);
        tracing::info!(max_tasks, "execution pool configured");
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_tasks)),
            max_tasks,
        }
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    pub fn runtime(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    /// Submit a task for execution. Never blocks: the task is queued for a
    /// free slot and the caller immediately receives the handle carrying the
    /// cancellation token and the event stream.
    pub fn submit(&self, task: TaskSpec, engine: Arc<dyn StegoEngine>) -> TaskHandle {
        let token = CancelToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        tracing::debug!(operation = %task.operation(), "task submitted");
        self.handle.spawn(run_task(
            task,
            engine,
            token.clone(),
            tx,
            Arc::clone(&self.permits),
        ));

        TaskHandle::new(token, rx)
    }

    /// Close admission. Running tasks finish normally; queued tasks that
    /// never obtained a slot terminate with a Cancelled outcome.
    pub fn shutdown(&self) {
        tracing::info!("execution pool shutting down");
        self.permits.close();
    }
}
