// Lightweight operation metrics, tracked with atomics and logged on shutdown.

use crate::exec::TaskOutcome;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Session-wide counters for background operations.
#[derive(Debug)]
pub struct OpsMetrics {
    pub tasks_completed: AtomicUsize,
    pub tasks_failed: AtomicUsize,
    pub tasks_cancelled: AtomicUsize,

    /// Total wall-clock time spent in tasks, in milliseconds
    pub total_task_time_ms: AtomicU64,

    /// Number of UI updates forwarded through the event-loop bridge
    pub ui_updates: AtomicU64,

    start_time: Instant,
}

impl OpsMetrics {
    pub fn new() -> Self {
        Self {
            tasks_completed: AtomicUsize::new(0),
            tasks_failed: AtomicUsize::new(0),
            tasks_cancelled: AtomicUsize::new(0),
            total_task_time_ms: AtomicU64::new(0),
            ui_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_outcome(&self, outcome: &TaskOutcome, duration: Duration) {
        match outcome {
            TaskOutcome::Completed(_) => self.tasks_completed.fetch_add(1, Ordering::Relaxed),
            TaskOutcome::Failed(_) => self.tasks_failed.fetch_add(1, Ordering::Relaxed),
            TaskOutcome::Cancelled => self.tasks_cancelled.fetch_add(1, Ordering::Relaxed),
        };
        self.total_task_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_ui_update(&self) {
        self.ui_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn finished_tasks(&self) -> usize {
        self.tasks_completed.load(Ordering::Relaxed)
            + self.tasks_failed.load(Ordering::Relaxed)
            + self.tasks_cancelled.load(Ordering::Relaxed)
    }

    /// Average task duration in milliseconds across all terminal outcomes.
    pub fn avg_task_time_ms(&self) -> f64 {
        let count = self.finished_tasks();
        if count == 0 {
            return 0.0;
        }
        self.total_task_time_ms.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "session summary: {} completed, {} failed, {} cancelled (avg {:.0} ms/task), {} UI updates, uptime {:.1}s",
            self.tasks_completed.load(Ordering::Relaxed),
            self.tasks_failed.load(Ordering::Relaxed),
            self.tasks_cancelled.load(Ordering::Relaxed),
            self.avg_task_time_ms(),
            self.ui_updates.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for OpsMetrics {
    fn default() -> Self {
        Self::new()
    }
}
