use crate::engine::AnalysisReport;
use crate::exec::{KdfParams, OperationKind};
use crate::history::HistoryLog;
use camino::Utf8PathBuf;
use std::collections::HashMap;

/// Progress surface data for one in-flight operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationProgress {
    /// `None` while the operation cannot quantify its progress.
    pub percent: Option<u8>,
    pub message: String,
}

impl OperationProgress {
    pub fn starting() -> Self {
        Self {
            percent: None,
            message: "Starting…".to_string(),
        }
    }
}

/// Single source of truth for all application state.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by
/// [`crate::state::StateManager`]. Never touch it directly - use
/// [`read()`](crate::state::StateManager::read) and
/// [`update()`](crate::state::StateManager::update), which take care of
/// locking and change events.
#[derive(Clone, Debug)]
pub struct AppState {
    // User settings (loaded from YAML, editable in the Settings view)
    pub default_output_dir: Option<Utf8PathBuf>,
    pub overwrite_existing: bool,
    pub encrypt_by_default: bool,
    pub kdf: KdfParams,
    pub debug_mode: bool,

    // Runtime state
    pub active: HashMap<OperationKind, OperationProgress>,
    pub status_message: String,
    /// Most recent analysis report, shown in the Analyze view.
    pub last_analysis: Option<AnalysisReport>,

    // Session results
    pub history: HistoryLog,
    pub completed_ops: usize,
    pub failed_ops: usize,
    pub cancelled_ops: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            default_output_dir: None,
            overwrite_existing: false,
            encrypt_by_default: true,
            kdf: KdfParams::default(),
            debug_mode: false,

            active: HashMap::new(),
            status_message: "Ready".to_string(),
            last_analysis: None,

            history: HistoryLog::new(),
            completed_ops: 0,
            failed_ops: 0,
            cancelled_ops: 0,
        }
    }
}

impl AppState {
    /// Whether an operation of this kind is currently in flight.
    pub fn is_busy(&self, operation: OperationKind) -> bool {
        self.active.contains_key(&operation)
    }

    pub fn any_busy(&self) -> bool {
        !self.active.is_empty()
    }

    /// Total operations that reached a terminal state this session.
    pub fn finished_ops(&self) -> usize {
        self.completed_ops + self.failed_ops + self.cancelled_ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let state = AppState::default();
        assert!(!state.any_busy());
        assert!(!state.is_busy(OperationKind::Embed));
        assert_eq!(state.finished_ops(), 0);
        assert_eq!(state.status_message, "Ready");
    }

    #[test]
    fn test_busy_tracking() {
        let mut state = AppState::default();
        state
            .active
            .insert(OperationKind::Analyze, OperationProgress::starting());

        assert!(state.any_busy());
        assert!(state.is_busy(OperationKind::Analyze));
        assert!(!state.is_busy(OperationKind::Embed));
    }
}
