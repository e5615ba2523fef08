// UiBridge - marshals work between the tokio runtime and the Slint event loop.
//
// Two event loops coexist: Slint's single-threaded GUI loop and tokio's
// worker pool. Task events arrive on tokio threads, but every widget update
// must happen on the Slint thread. The bridge owns a forwarder thread that
// drains queued update closures and replays them inside the event loop via
// Weak::upgrade_in_event_loop, so callers never touch the UI from the wrong
// thread.

use slint::{ComponentHandle, Weak};
use std::future::Future;
use tokio::sync::mpsc;

/// Update queue depth. Updates beyond this are dropped with a warning rather
/// than letting a stalled event loop grow the queue without bound.
const UPDATE_QUEUE_CAPACITY: usize = 64;

type UpdateFn<T> = Box<dyn FnOnce(&T) + Send>;

/// Cloneable handle tying a Slint component to a tokio runtime.
///
/// - [`update_ui()`](Self::update_ui) queues a widget update from any thread
/// - [`spawn()`](Self::spawn) launches an async task from a Slint callback
pub struct UiBridge<T: ComponentHandle> {
    ui: Weak<T>,
    runtime: tokio::runtime::Handle,
    updates: mpsc::Sender<UpdateFn<T>>,
}

// Manual Clone so T itself doesn't need to be Clone.
impl<T: ComponentHandle> Clone for UiBridge<T> {
    fn clone(&self) -> Self {
        Self {
            ui: self.ui.clone(),
            runtime: self.runtime.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl<T: ComponentHandle + 'static> UiBridge<T> {
    /// Create the bridge and start its forwarder thread.
    pub fn new(ui: &T, runtime: tokio::runtime::Handle) -> Self {
        let ui_weak = ui.as_weak();
        let (updates, mut update_rx) = mpsc::channel::<UpdateFn<T>>(UPDATE_QUEUE_CAPACITY);

        let forwarder_ui = ui_weak.clone();
        std::thread::spawn(move || {
            tracing::debug!("UI bridge forwarder thread started");

            while let Some(update_fn) = update_rx.blocking_recv() {
                let queued = forwarder_ui.upgrade_in_event_loop(move |ui| update_fn(&ui));
                if let Err(err) = queued {
                    // The event loop is gone; nothing left to forward to.
                    tracing::warn!("failed to queue UI update: {err:?}");
                    break;
                }
            }

            tracing::debug!("UI bridge forwarder thread terminated");
        });

        Self {
            ui: ui_weak,
            runtime,
            updates,
        }
    }

    /// Queue a widget update from any thread. The closure runs on the Slint
    /// event loop thread on its next iteration.
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        match self.updates.try_send(Box::new(update)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("UI update queue full - dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("UI update queue closed - forwarder thread has stopped");
            }
        }
    }

    /// Spawn an async task on the tokio runtime from a Slint callback, keeping
    /// the GUI responsive while the work runs.
    pub fn spawn<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(async move {
            future_factory().await;
        });
    }

    /// Weak reference to the UI component for custom upgrades.
    pub fn ui(&self) -> &Weak<T> {
        &self.ui
    }
}
