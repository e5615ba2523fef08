// GUI Controller - wires the Slint shell to state, engines, and the pool.
//
// Responsibilities:
// - Slint callbacks -> task submission on the shared execution pool
// - one cancellation token per in-flight operation, cancelled from the UI
// - state change events -> widget updates through the UiBridge
// - native file pickers (rfd) and history CSV export

use crate::config::ConfigManager;
use crate::engine::{OperationOutput, StegoEngine};
use crate::exec::{
    AnalyzeParams, CancelToken, EmbedMethod, EmbedParams, ExecPool, ExtractParams,
    NeutralizeParams, NeutralizeTier, OperationKind, PayloadSource, TaskEvent, TaskOutcome,
    TaskParams, TaskSpec,
};
use crate::history::HistoryRecord;
use crate::metrics::OpsMetrics;
use crate::models::{AppState, UserConfig};
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::UiBridge;
use crate::validation;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ComponentHandle, ModelRc, VecModel};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

// Include the generated Slint code
slint::include_modules!();

/// Cancellation tokens for in-flight operations, keyed by kind. Shared with
/// main so shutdown can cancel whatever is still running.
pub type InflightTokens = Arc<Mutex<HashMap<OperationKind, CancelToken>>>;

/// Everything a submission path needs, cloneable into Slint callbacks.
#[derive(Clone)]
struct SubmitCtx {
    bridge: UiBridge<AppWindow>,
    state: Arc<StateManager>,
    pool: ExecPool,
    engine: Arc<dyn StegoEngine>,
    metrics: Arc<OpsMetrics>,
    inflight: InflightTokens,
}

/// Coordinates the Slint window with application state and the execution core.
pub struct GuiController {
    ui: AppWindow,
    state: Arc<StateManager>,
    inflight: InflightTokens,
}

impl GuiController {
    pub fn new(
        state: Arc<StateManager>,
        config: Arc<ConfigManager>,
        pool: ExecPool,
        engine: Arc<dyn StegoEngine>,
        metrics: Arc<OpsMetrics>,
    ) -> Result<Self> {
        let ui = AppWindow::new().context("Failed to create Slint UI")?;
        let bridge = UiBridge::new(&ui, pool.runtime().clone());
        let inflight: InflightTokens = Arc::new(Mutex::new(HashMap::new()));

        let ctx = SubmitCtx {
            bridge: bridge.clone(),
            state: Arc::clone(&state),
            pool,
            engine,
            metrics: Arc::clone(&metrics),
            inflight: Arc::clone(&inflight),
        };

        Self::sync_ui_with_state(&ui, &state);
        Self::setup_callbacks(&ui, &ctx, &config);
        Self::setup_state_subscription(&bridge, &state, &metrics);
        Self::setup_close_handler(&ui, &state, &inflight);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            state,
            inflight,
        })
    }

    /// Run the GUI. Blocks until the window is closed.
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("starting GUI event loop");
        self.ui.run()
    }

    /// Shared handle to the in-flight token map, for shutdown cancellation.
    pub fn inflight_tokens(&self) -> InflightTokens {
        Arc::clone(&self.inflight)
    }

    /// Cancel every in-flight operation.
    pub fn cancel_all(&self) {
        for token in self.inflight.lock().unwrap().values() {
            token.cancel();
        }
        self.state.update(|s| {
            s.status_message = "Cancelling all operations…".to_string();
        });
    }

    // ===== Initial sync =====

    fn sync_ui_with_state(ui: &AppWindow, state: &StateManager) {
        let snapshot = state.snapshot();
        Self::apply_settings_to_ui(ui, &snapshot);
        Self::refresh_history(ui, &snapshot);
        ui.set_status_message(snapshot.status_message.clone().into());

        // Embed form defaults follow the user's settings
        ui.set_embed_encrypt(snapshot.encrypt_by_default);
        if let Some(dir) = &snapshot.default_output_dir {
            ui.set_embed_output_dir(dir.as_str().into());
        }

        tracing::debug!("UI synchronized with initial state");
    }

    // ===== Callbacks =====

    fn setup_callbacks(ui: &AppWindow, ctx: &SubmitCtx, config: &Arc<ConfigManager>) {
        // --- Embed view ---

        let ui_weak = ui.as_weak();
        ui.on_browse_embed_carrier(move || {
            if let Some(path) = Self::pick_media_file("Select carrier") {
                if let Some(ui) = ui_weak.upgrade() {
                    let capacity = match validation::estimate_capacity(&path) {
                        Ok(bytes) => format!("Approx. {bytes} bytes"),
                        Err(err) => err.to_string(),
                    };
                    ui.set_embed_carrier_path(path.as_str().into());
                    ui.set_embed_capacity_text(capacity.into());
                }
            }
        });

        let ui_weak = ui.as_weak();
        ui.on_browse_embed_payload(move || {
            if let Some(path) = Self::pick_any_file("Select payload file") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_embed_payload_file(path.as_str().into());
                }
            }
        });

        let ui_weak = ui.as_weak();
        ui.on_browse_embed_output(move || {
            if let Some(path) = Self::pick_folder("Select output folder") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_embed_output_dir(path.as_str().into());
                }
            }
        });

        let ctx_clone = ctx.clone();
        let ui_weak = ui.as_weak();
        ui.on_start_embed(move || {
            let Some(ui) = ui_weak.upgrade() else { return };
            match Self::collect_embed_task(&ui, &ctx_clone.state) {
                Ok(task) => Self::spawn_task(&ctx_clone, task),
                Err(message) => Self::report_input_error(&ctx_clone.state, message),
            }
        });

        let inflight = Arc::clone(&ctx.inflight);
        ui.on_cancel_embed(move || Self::cancel_operation(&inflight, OperationKind::Embed));

        // --- Extract view ---

        let ui_weak = ui.as_weak();
        ui.on_browse_extract_stego(move || {
            if let Some(path) = Self::pick_media_file("Select stego file") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_extract_stego_path(path.as_str().into());
                }
            }
        });

        let ctx_clone = ctx.clone();
        let ui_weak = ui.as_weak();
        ui.on_start_extract(move || {
            let Some(ui) = ui_weak.upgrade() else { return };
            match Self::collect_extract_task(&ui) {
                Ok(task) => Self::spawn_task(&ctx_clone, task),
                Err(message) => Self::report_input_error(&ctx_clone.state, message),
            }
        });

        let inflight = Arc::clone(&ctx.inflight);
        ui.on_cancel_extract(move || Self::cancel_operation(&inflight, OperationKind::Extract));

        // --- Analyze view ---

        let ui_weak = ui.as_weak();
        ui.on_browse_analyze_file(move || {
            if let Some(path) = Self::pick_media_file("Select media file") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_analyze_path(path.as_str().into());
                }
            }
        });

        let ctx_clone = ctx.clone();
        let ui_weak = ui.as_weak();
        ui.on_start_analyze(move || {
            let Some(ui) = ui_weak.upgrade() else { return };
            match Self::collect_analyze_task(&ui) {
                Ok(task) => Self::spawn_task(&ctx_clone, task),
                Err(message) => Self::report_input_error(&ctx_clone.state, message),
            }
        });

        let inflight = Arc::clone(&ctx.inflight);
        ui.on_cancel_analyze(move || Self::cancel_operation(&inflight, OperationKind::Analyze));

        // --- Neutralize view ---

        let ui_weak = ui.as_weak();
        ui.on_browse_neutralize_file(move || {
            if let Some(path) = Self::pick_media_file("Select media file") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_neutralize_path(path.as_str().into());
                }
            }
        });

        let ctx_clone = ctx.clone();
        let ui_weak = ui.as_weak();
        ui.on_start_neutralize(move || {
            let Some(ui) = ui_weak.upgrade() else { return };
            match Self::collect_neutralize_task(&ui, &ctx_clone.state) {
                Ok(task) => Self::spawn_task(&ctx_clone, task),
                Err(message) => Self::report_input_error(&ctx_clone.state, message),
            }
        });

        let inflight = Arc::clone(&ctx.inflight);
        ui.on_cancel_neutralize(move || {
            Self::cancel_operation(&inflight, OperationKind::Neutralize)
        });

        // --- History view ---

        let state = Arc::clone(&ctx.state);
        ui.on_export_history(move || {
            let snapshot = state.snapshot();
            if snapshot.history.is_empty() {
                Self::report_input_error(&state, "Nothing to export yet".to_string());
                return;
            }
            if let Some(path) = Self::pick_save_file("Export history", "history.csv") {
                match snapshot.history.export_csv(&path) {
                    Ok(()) => {
                        state.update(|s| {
                            s.status_message = format!("History exported to {path}");
                        });
                    }
                    Err(err) => {
                        tracing::error!("history export failed: {err:#}");
                        Self::report_input_error(&state, format!("Export failed: {err}"));
                    }
                }
            }
        });

        // --- Settings view ---

        let ui_weak = ui.as_weak();
        ui.on_browse_settings_output(move || {
            if let Some(path) = Self::pick_folder("Select default output folder") {
                if let Some(ui) = ui_weak.upgrade() {
                    ui.set_settings_output_dir(path.as_str().into());
                }
            }
        });

        let state = Arc::clone(&ctx.state);
        let config = Arc::clone(config);
        let ui_weak = ui.as_weak();
        ui.on_save_settings(move || {
            let Some(ui) = ui_weak.upgrade() else { return };

            let mut user_config = UserConfig::default();
            let settings = &mut user_config.settings;
            settings.default_output = ui.get_settings_output_dir().to_string();
            settings.overwrite_existing = ui.get_settings_overwrite();
            settings.encrypt_by_default = ui.get_settings_encrypt_default();
            settings.argon2_memory = ui.get_settings_argon_memory() as u32;
            settings.argon2_time_cost = ui.get_settings_argon_time() as u32;
            settings.argon2_parallelism = ui.get_settings_argon_parallelism() as u32;
            settings.debug_mode = state.read(|s| s.debug_mode);

            state.load_from_user_config(&user_config);
            match config.save_user_config(&user_config) {
                Ok(()) => {
                    state.update(|s| {
                        s.status_message = "Settings saved".to_string();
                    });
                }
                Err(err) => {
                    tracing::error!("failed to save settings: {err:#}");
                    Self::report_input_error(&state, format!("Saving settings failed: {err}"));
                }
            }
        });

        tracing::debug!("UI callbacks configured");
    }

    fn setup_close_handler(ui: &AppWindow, state: &Arc<StateManager>, inflight: &InflightTokens) {
        let state = Arc::clone(state);
        let inflight = Arc::clone(inflight);

        ui.window().on_close_requested(move || {
            if state.read(|s| s.any_busy()) {
                tracing::warn!("window closing with operations in flight - cancelling them");
                for token in inflight.lock().unwrap().values() {
                    token.cancel();
                }
            }
            slint::CloseRequestResponse::HideWindow
        });
    }

    // ===== Task submission =====

    /// Submit a task and forward its event stream into application state.
    /// One operation of each kind may be in flight at a time; the pool bounds
    /// how many run concurrently across all views.
    fn spawn_task(ctx: &SubmitCtx, task: TaskSpec) {
        let operation = task.operation();

        if ctx.state.read(|s| s.is_busy(operation)) {
            tracing::warn!(%operation, "operation already in flight, ignoring");
            return;
        }

        let mut handle = ctx.pool.submit(task.clone(), Arc::clone(&ctx.engine));
        ctx.inflight
            .lock()
            .unwrap()
            .insert(operation, handle.token());
        ctx.state.begin_operation(operation);

        let started = Instant::now();
        let bridge = ctx.bridge.clone();
        let ctx = ctx.clone();
        bridge.spawn(move || async move {
            while let Some(event) = handle.next_event().await {
                match event {
                    TaskEvent::Progress(update) => {
                        ctx.state.update_operation_progress(
                            operation,
                            update.percent,
                            update.message.unwrap_or_default(),
                        );
                    }
                    TaskEvent::Finished(outcome) => {
                        let duration = started.elapsed();
                        ctx.metrics.record_outcome(&outcome, duration);
                        ctx.inflight.lock().unwrap().remove(&operation);

                        if let TaskOutcome::Completed(OperationOutput::Analyzed(report)) = &outcome
                        {
                            let report = report.clone();
                            ctx.state.update(|s| s.last_analysis = Some(report));
                        }

                        let record = HistoryRecord::from_outcome(&task, &outcome, duration);
                        ctx.state.finish_operation(operation, record);
                        break;
                    }
                }
            }
        });
    }

    fn cancel_operation(inflight: &InflightTokens, operation: OperationKind) {
        if let Some(token) = inflight.lock().unwrap().get(&operation) {
            tracing::info!(%operation, "cancel requested from UI");
            token.cancel();
        }
    }

    fn report_input_error(state: &StateManager, message: String) {
        tracing::warn!("rejected submission: {message}");
        state.update(|s| s.status_message = message);
    }

    // ===== Form collectors =====

    fn collect_embed_task(ui: &AppWindow, state: &StateManager) -> Result<TaskSpec, String> {
        let carrier = Utf8PathBuf::from(ui.get_embed_carrier_path().to_string());
        if carrier.as_str().is_empty() {
            return Err("Select a carrier file first".to_string());
        }
        let check = validation::validate_carrier(&carrier);
        if !check.valid {
            return Err(check.message);
        }

        let payload = if ui.get_embed_payload_mode() == 0 {
            PayloadSource::Text(ui.get_embed_payload_text().to_string())
        } else {
            let path = ui.get_embed_payload_file().to_string();
            if path.is_empty() {
                return Err("Select a payload file first".to_string());
            }
            PayloadSource::File(Utf8PathBuf::from(path))
        };

        let password = ui.get_embed_password().to_string();
        let (kdf, default_output) = state.read(|s| (s.kdf, s.default_output_dir.clone()));

        let output_dir_text = ui.get_embed_output_dir().to_string();
        let output_dir = if !output_dir_text.is_empty() {
            Utf8PathBuf::from(output_dir_text)
        } else if let Some(dir) = default_output {
            dir
        } else {
            carrier
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| Utf8PathBuf::from("."))
        };

        let template = ui.get_embed_filename_template().to_string();
        let params = EmbedParams {
            payload,
            password: (!password.is_empty()).then_some(password),
            encryption: ui.get_embed_encrypt(),
            kdf,
            method: EmbedMethod::from_index(ui.get_embed_method_index() as usize),
            techniques: vec!["lsb_match".to_string(), "metadata".to_string()],
            output_dir,
            filename_template: if template.is_empty() {
                "stego_{timestamp}".to_string()
            } else {
                template
            },
        };

        Ok(TaskSpec::new(vec![carrier], TaskParams::Embed(params)))
    }

    fn collect_extract_task(ui: &AppWindow) -> Result<TaskSpec, String> {
        let stego = Utf8PathBuf::from(ui.get_extract_stego_path().to_string());
        if stego.as_str().is_empty() {
            return Err("Select a stego file first".to_string());
        }
        if !stego.exists() {
            return Err("File not found".to_string());
        }

        let password = ui.get_extract_password().to_string();
        let params = ExtractParams {
            password: (!password.is_empty()).then_some(password),
        };

        Ok(TaskSpec::new(vec![stego], TaskParams::Extract(params)))
    }

    fn collect_analyze_task(ui: &AppWindow) -> Result<TaskSpec, String> {
        let file = Utf8PathBuf::from(ui.get_analyze_path().to_string());
        if file.as_str().is_empty() {
            return Err("Select a media file first".to_string());
        }
        let check = validation::validate_carrier(&file);
        if !check.valid {
            return Err(check.message);
        }

        Ok(TaskSpec::new(
            vec![file],
            TaskParams::Analyze(AnalyzeParams::default()),
        ))
    }

    fn collect_neutralize_task(ui: &AppWindow, state: &StateManager) -> Result<TaskSpec, String> {
        let file = Utf8PathBuf::from(ui.get_neutralize_path().to_string());
        if file.as_str().is_empty() {
            return Err("Select a media file first".to_string());
        }
        let check = validation::validate_carrier(&file);
        if !check.valid {
            return Err(check.message);
        }

        let params = NeutralizeParams {
            tier: NeutralizeTier::from_index(ui.get_neutralize_tier_index() as usize),
            output_dir: state.read(|s| s.default_output_dir.clone()),
        };

        Ok(TaskSpec::new(vec![file], TaskParams::Neutralize(params)))
    }

    // ===== State subscription -> UI updates =====

    fn setup_state_subscription(
        bridge: &UiBridge<AppWindow>,
        state: &Arc<StateManager>,
        metrics: &Arc<OpsMetrics>,
    ) {
        let bridge = bridge.clone();
        let state = Arc::clone(state);
        let metrics = Arc::clone(metrics);
        let mut rx = state.subscribe();

        std::thread::spawn(move || {
            tracing::debug!("state subscription thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(change) => {
                        metrics.record_ui_update();
                        Self::forward_change(&bridge, &state, change);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        tracing::info!("state channel closed - stopping subscription thread");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("state subscription lagged, {skipped} events skipped");
                    }
                }
            }

            tracing::debug!("state subscription thread terminated");
        });
    }

    fn forward_change(bridge: &UiBridge<AppWindow>, state: &Arc<StateManager>, change: StateChange) {
        match change {
            StateChange::SettingsChanged => {
                let snapshot = state.snapshot();
                bridge.update_ui(move |ui| Self::apply_settings_to_ui(ui, &snapshot));
            }

            StateChange::OperationStarted { operation } => {
                bridge.update_ui(move |ui| {
                    Self::set_view_busy(ui, operation, true);
                    Self::set_view_progress(ui, operation, None, "Starting…".to_string());
                });
            }

            StateChange::ProgressUpdated {
                operation,
                percent,
                message,
            } => {
                bridge.update_ui(move |ui| {
                    Self::set_view_progress(ui, operation, percent, message);
                });
            }

            StateChange::OperationFinished {
                operation,
                status,
                message,
            } => {
                let snapshot = state.snapshot();
                bridge.update_ui(move |ui| {
                    Self::set_view_busy(ui, operation, false);
                    Self::apply_outcome_to_ui(ui, operation, &status, &message, &snapshot);
                    Self::refresh_history(ui, &snapshot);
                });
            }

            StateChange::StatusChanged { message } => {
                bridge.update_ui(move |ui| ui.set_status_message(message.into()));
            }

            StateChange::StateReset => {
                let snapshot = state.snapshot();
                bridge.update_ui(move |ui| {
                    Self::refresh_history(ui, &snapshot);
                    ui.set_status_message(snapshot.status_message.clone().into());
                });
            }
        }
    }

    // ===== Widget helpers (event loop thread only) =====

    fn set_view_busy(ui: &AppWindow, operation: OperationKind, busy: bool) {
        match operation {
            OperationKind::Embed => ui.set_embed_busy(busy),
            OperationKind::Extract => ui.set_extract_busy(busy),
            OperationKind::Analyze => ui.set_analyze_busy(busy),
            OperationKind::Neutralize => ui.set_neutralize_busy(busy),
        }
    }

    fn set_view_progress(
        ui: &AppWindow,
        operation: OperationKind,
        percent: Option<u8>,
        message: String,
    ) {
        let fraction = percent.map(|p| f32::from(p) / 100.0).unwrap_or(0.0);
        let indeterminate = percent.is_none();
        match operation {
            OperationKind::Embed => {
                ui.set_embed_progress(fraction);
                ui.set_embed_indeterminate(indeterminate);
                ui.set_embed_progress_text(message.into());
            }
            OperationKind::Extract => {
                ui.set_extract_progress(fraction);
                ui.set_extract_indeterminate(indeterminate);
                ui.set_extract_progress_text(message.into());
            }
            OperationKind::Analyze => {
                ui.set_analyze_progress(fraction);
                ui.set_analyze_indeterminate(indeterminate);
                ui.set_analyze_progress_text(message.into());
            }
            OperationKind::Neutralize => {
                ui.set_neutralize_progress(fraction);
                ui.set_neutralize_indeterminate(indeterminate);
                ui.set_neutralize_progress_text(message.into());
            }
        }
    }

    fn apply_outcome_to_ui(
        ui: &AppWindow,
        operation: OperationKind,
        status: &str,
        message: &str,
        snapshot: &AppState,
    ) {
        match operation {
            OperationKind::Extract => {
                ui.set_extract_result_text(format!("{status}: {message}").into());
            }
            OperationKind::Analyze => {
                ui.set_analyze_risk_text(message.to_string().into());
                let flags_text = snapshot
                    .last_analysis
                    .as_ref()
                    .map(|report| {
                        report
                            .flags
                            .iter()
                            .map(|(name, score)| format!("{name}: {score:.3}"))
                            .collect::<Vec<_>>()
                            .join("   ")
                    })
                    .unwrap_or_default();
                ui.set_analyze_flags_text(flags_text.into());
            }
            OperationKind::Neutralize => {
                ui.set_neutralize_result_text(format!("{status}: {message}").into());
            }
            OperationKind::Embed => {
                // Status bar carries the summary; nothing view-local to show.
            }
        }
    }

    fn apply_settings_to_ui(ui: &AppWindow, snapshot: &AppState) {
        ui.set_settings_output_dir(
            snapshot
                .default_output_dir
                .as_ref()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default()
                .into(),
        );
        ui.set_settings_overwrite(snapshot.overwrite_existing);
        ui.set_settings_encrypt_default(snapshot.encrypt_by_default);
        ui.set_settings_argon_memory(snapshot.kdf.memory_mib as i32);
        ui.set_settings_argon_time(snapshot.kdf.time_cost as i32);
        ui.set_settings_argon_parallelism(snapshot.kdf.parallelism as i32);
    }

    fn refresh_history(ui: &AppWindow, snapshot: &AppState) {
        // Newest entries first
        let rows: Vec<HistoryRow> = snapshot
            .history
            .entries()
            .iter()
            .rev()
            .map(|record| HistoryRow {
                time: record
                    .timestamp
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .into(),
                operation: record.operation.label().into(),
                target: record.target.as_str().into(),
                status: record.status.clone().into(),
                message: record.message.clone().into(),
                risk: record
                    .risk_score
                    .map(|r| r.to_string())
                    .unwrap_or_default()
                    .into(),
            })
            .collect();

        ui.set_history_rows(ModelRc::new(VecModel::from(rows)));
    }

    // ===== File pickers =====

    fn pick_media_file(title: &str) -> Option<Utf8PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .add_filter("Images", validation::IMAGE_EXTENSIONS)
            .add_filter("Audio", validation::AUDIO_EXTENSIONS)
            .add_filter("Video", validation::VIDEO_EXTENSIONS)
            .pick_file()
            .and_then(Self::into_utf8)
    }

    fn pick_any_file(title: &str) -> Option<Utf8PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .pick_file()
            .and_then(Self::into_utf8)
    }

    fn pick_folder(title: &str) -> Option<Utf8PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .pick_folder()
            .and_then(Self::into_utf8)
    }

    fn pick_save_file(title: &str, file_name: &str) -> Option<Utf8PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_file_name(file_name)
            .add_filter("CSV", &["csv"])
            .save_file()
            .and_then(Self::into_utf8)
    }

    fn into_utf8(path: std::path::PathBuf) -> Option<Utf8PathBuf> {
        Utf8PathBuf::try_from(path)
            .map_err(|err| {
                tracing::error!("selected path is not UTF-8: {err}");
                err
            })
            .ok()
    }
}
