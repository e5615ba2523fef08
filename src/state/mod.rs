// State management module
//
// Wraps AppState in Arc<RwLock<T>> and emits change events over a broadcast
// channel so the GUI can react without polling.

use crate::history::HistoryRecord;
use crate::models::{AppState, OperationProgress, UserConfig};
use crate::exec::OperationKind;
use camino::Utf8PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// User settings were updated
    SettingsChanged,

    /// An operation was submitted and is now in flight
    OperationStarted { operation: OperationKind },

    /// Progress surface data changed for an in-flight operation
    ProgressUpdated {
        operation: OperationKind,
        percent: Option<u8>,
        message: String,
    },

    /// An operation reached its terminal state
    OperationFinished {
        operation: OperationKind,
        status: String,
        message: String,
    },

    /// The status bar message changed
    StatusChanged { message: String },

    /// Session results were cleared
    StateReset,
}

/// Thread-safe state manager with event emission.
///
/// - [`read()`](Self::read) for reading without cloning the whole state
/// - [`update()`](Self::update) for mutations with automatic change events
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for state change events; multiple subscribers may
    /// listen simultaneously.
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Cloned snapshot of the current state.
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Apply a mutation, diff old vs. new state, and emit the corresponding
    /// change events. Returns the events that were emitted.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);
        for change in &changes {
            // Send errors just mean nobody is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.default_output_dir != new.default_output_dir
            || old.overwrite_existing != new.overwrite_existing
            || old.encrypt_by_default != new.encrypt_by_default
            || old.kdf != new.kdf
            || old.debug_mode != new.debug_mode
        {
            changes.push(StateChange::SettingsChanged);
        }

        for (operation, progress) in &new.active {
            match old.active.get(operation) {
                None => changes.push(StateChange::OperationStarted {
                    operation: *operation,
                }),
                Some(previous) if previous != progress => {
                    changes.push(StateChange::ProgressUpdated {
                        operation: *operation,
                        percent: progress.percent,
                        message: progress.message.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        // Removals from `active` carry outcome detail the diff cannot see;
        // finish_operation() emits OperationFinished explicitly.

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusChanged {
                message: new.status_message.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Mark an operation as in flight.
    pub fn begin_operation(&self, operation: OperationKind) -> Vec<StateChange> {
        self.update(|state| {
            state
                .active
                .insert(operation, OperationProgress::starting());
            state.status_message = format!("{operation} started");
        })
    }

    /// Update the progress surface for an in-flight operation. Progress for
    /// an operation that already finished is dropped.
    pub fn update_operation_progress(
        &self,
        operation: OperationKind,
        percent: Option<u8>,
        message: String,
    ) -> Vec<StateChange> {
        self.update(|state| {
            if let Some(progress) = state.active.get_mut(&operation) {
                progress.percent = percent;
                progress.message = message;
            }
        })
    }

    /// Record a terminal outcome: clears the in-flight entry, bumps session
    /// counters, appends to history, and emits OperationFinished.
    pub fn finish_operation(
        &self,
        operation: OperationKind,
        record: HistoryRecord,
    ) -> Vec<StateChange> {
        let status = record.status.clone();
        let message = record.message.clone();

        let mut changes = self.update(|state| {
            state.active.remove(&operation);
            match record.status.as_str() {
                "completed" => state.completed_ops += 1,
                "failed" => state.failed_ops += 1,
                _ => state.cancelled_ops += 1,
            }
            state.status_message = format!("{operation} {}: {}", record.status, record.message);
            state.history.append(record);
        });

        let finished = StateChange::OperationFinished {
            operation,
            status,
            message,
        };
        let _ = self.state_tx.send(finished.clone());
        changes.push(finished);

        changes
    }

    /// Clear session results and history.
    pub fn reset_session(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.history = crate::history::HistoryLog::new();
            state.completed_ops = 0;
            state.failed_ops = 0;
            state.cancelled_ops = 0;
            state.status_message = "Ready".to_string();
        });

        let reset = StateChange::StateReset;
        let _ = self.state_tx.send(reset.clone());
        changes.push(reset);

        changes
    }

    /// Update user settings.
    pub fn update_settings<F>(&self, settings_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        self.update(settings_fn)
    }

    /// Populate settings fields from a loaded user configuration.
    pub fn load_from_user_config(&self, user_config: &UserConfig) -> Vec<StateChange> {
        self.update(|state| {
            let settings = &user_config.settings;

            if !settings.default_output.is_empty() {
                state.default_output_dir = Some(Utf8PathBuf::from(&settings.default_output));
            }
            state.overwrite_existing = settings.overwrite_existing;
            state.encrypt_by_default = settings.encrypt_by_default;
            state.kdf = settings.kdf();
            state.debug_mode = settings.debug_mode;

            tracing::info!(
                "loaded user config: output={:?}, encrypt_by_default={}, debug={}",
                state.default_output_dir,
                state.encrypt_by_default,
                state.debug_mode
            );
        })
    }

    /// Arc reference to the underlying state for worker threads.
    pub fn state_arc(&self) -> Arc<RwLock<AppState>> {
        Arc::clone(&self.state)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Cloneable for sharing across threads; clones share state and channel.
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{AnalyzeParams, TaskOutcome, TaskParams, TaskSpec};
    use std::time::Duration;

    fn cancelled_record(operation_path: &str) -> HistoryRecord {
        let spec = TaskSpec::new(
            vec![Utf8PathBuf::from(operation_path)],
            TaskParams::Analyze(AnalyzeParams::default()),
        );
        HistoryRecord::from_outcome(&spec, &TaskOutcome::Cancelled, Duration::ZERO)
    }

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(!state.any_busy());
        assert_eq!(state.finished_ops(), 0);
    }

    #[test]
    fn test_begin_operation_emits_started() {
        let manager = StateManager::new();

        let changes = manager.begin_operation(OperationKind::Embed);

        assert!(changes.contains(&StateChange::OperationStarted {
            operation: OperationKind::Embed
        }));
        assert!(manager.read(|s| s.is_busy(OperationKind::Embed)));
    }

    #[test]
    fn test_progress_updates_emit_events() {
        let manager = StateManager::new();
        manager.begin_operation(OperationKind::Analyze);

        let changes = manager.update_operation_progress(
            OperationKind::Analyze,
            Some(40),
            "Scanning…".to_string(),
        );

        assert!(changes.iter().any(|c| matches!(
            c,
            StateChange::ProgressUpdated {
                operation: OperationKind::Analyze,
                percent: Some(40),
                ..
            }
        )));
    }

    #[test]
    fn test_progress_for_finished_operation_is_dropped() {
        let manager = StateManager::new();

        let changes = manager.update_operation_progress(
            OperationKind::Extract,
            Some(10),
            "late".to_string(),
        );

        assert!(
            changes
                .iter()
                .all(|c| !matches!(c, StateChange::ProgressUpdated { .. }))
        );
    }

    #[test]
    fn test_finish_operation_records_history_and_counters() {
        let manager = StateManager::new();
        manager.begin_operation(OperationKind::Analyze);

        let changes =
            manager.finish_operation(OperationKind::Analyze, cancelled_record("photo.png"));

        assert!(changes.iter().any(|c| matches!(
            c,
            StateChange::OperationFinished {
                operation: OperationKind::Analyze,
                ..
            }
        )));

        let state = manager.snapshot();
        assert!(!state.is_busy(OperationKind::Analyze));
        assert_eq!(state.cancelled_ops, 1);
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn test_settings_change_detection() {
        let manager = StateManager::new();

        let changes = manager.update_settings(|state| {
            state.encrypt_by_default = false;
            state.kdf.memory_mib = 128;
        });

        assert_eq!(changes[0], StateChange::SettingsChanged);
    }

    #[test]
    fn test_load_from_user_config() {
        let manager = StateManager::new();
        let mut config = UserConfig::default();
        config.settings.default_output = "/tmp/out".to_string();
        config.settings.argon2_memory = 256;

        manager.load_from_user_config(&config);

        let state = manager.snapshot();
        assert_eq!(state.default_output_dir, Some(Utf8PathBuf::from("/tmp/out")));
        assert_eq!(state.kdf.memory_mib, 256);
    }

    #[test]
    fn test_reset_session() {
        let manager = StateManager::new();
        manager.begin_operation(OperationKind::Embed);
        manager.finish_operation(OperationKind::Embed, cancelled_record("a.png"));

        let changes = manager.reset_session();

        assert!(changes.iter().any(|c| matches!(c, StateChange::StateReset)));
        let state = manager.snapshot();
        assert_eq!(state.finished_ops(), 0);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.begin_operation(OperationKind::Neutralize);

        let event = rx.try_recv();
        assert!(matches!(
            event,
            Ok(StateChange::OperationStarted {
                operation: OperationKind::Neutralize
            })
        ));
    }

    #[test]
    fn test_multiple_subscribers() {
        let manager = StateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.begin_operation(OperationKind::Embed);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_clone_shares_state() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.begin_operation(OperationKind::Extract);

        assert!(manager2.read(|s| s.is_busy(OperationKind::Extract)));
    }

    #[test]
    fn test_state_arc() {
        let manager = StateManager::new();
        let state_arc = manager.state_arc();

        {
            let mut state = state_arc.write().unwrap();
            state.completed_ops = 7;
        }

        assert_eq!(manager.read(|s| s.completed_ops), 7);
    }
}
