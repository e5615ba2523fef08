//! STEGOSIGHT - steganography workbench scaffold
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! The binary wires together:
//! - Logging infrastructure (rotating file + console output)
//! - Tokio runtime (substrate of the shared execution pool)
//! - State management ([`StateManager`])
//! - Configuration loading ([`ConfigManager`])
//! - The mock engine behind the capability trait
//! - GUI controller ([`GuiController`] - bridges the Slint shell with the core)
//!
//! Threading model:
//! - **Main thread**: runs the Slint event loop (blocking)
//! - **Tokio workers**: run background tasks through the shared pool
//! - **State listener**: background thread forwarding state changes to the UI
//!
//! # Execution flow
//!
//! 1. Initialize logging -> logs/stegosight.<date>
//! 2. Build the tokio runtime and the shared execution pool
//! 3. `--scan <files…>` runs the CLI analysis mode against the same core
//! 4. Otherwise load `STEGOSIGHT Data/STEGOSIGHT Config.yaml` into state,
//!    launch the window, and block until it closes
//! 5. On shutdown: cancel in-flight work, close pool admission, log metrics

use anyhow::Result;
use camino::Utf8PathBuf;
use std::sync::Arc;
use stegosight::engine::OperationOutput;
use stegosight::exec::{AnalyzeParams, TaskParams};
use stegosight::metrics::OpsMetrics;
use stegosight::ui::GuiController;
use stegosight::{
    APP_NAME, ConfigManager, ExecPool, MockEngine, StateManager, StegoEngine, TaskOutcome,
    TaskSpec, VERSION,
};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let _log_guard = stegosight::logging::init("logs", "stegosight", false, true)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // The runtime's worker threads are the execution pool's substrate; the
    // pool itself bounds how many tasks run at once.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("stegosight-worker")
        .build()?;

    let pool = ExecPool::new(runtime.handle().clone());
    let engine: Arc<dyn StegoEngine> = Arc::new(MockEngine::new());

    if args.first().map(String::as_str) == Some("--scan") {
        return run_scan_cli(&runtime, &pool, &engine, &args[1..]);
    }

    let state_manager = Arc::new(StateManager::new());
    let config_manager = Arc::new(ConfigManager::new("STEGOSIGHT Data")?);
    let user_config = config_manager.load_user_config()?;
    state_manager.load_from_user_config(&user_config);

    let metrics = Arc::new(OpsMetrics::new());

    let controller = GuiController::new(
        Arc::clone(&state_manager),
        Arc::clone(&config_manager),
        pool.clone(),
        Arc::clone(&engine),
        Arc::clone(&metrics),
    )?;

    // Kept outside the controller so shutdown can cancel whatever is left
    // after the window closes.
    let inflight = controller.inflight_tokens();

    tracing::info!("GUI controller initialized, launching window");
    let result = controller.run();

    tracing::info!("GUI closed, shutting down");

    for token in inflight.lock().unwrap().values() {
        token.cancel();
    }
    pool.shutdown();

    // Give cancelled tasks a moment to reach their terminal state
    std::thread::sleep(std::time::Duration::from_millis(300));

    metrics.log_summary();
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}

/// Headless scan mode: analyze the given files through the same submit/await
/// path the GUI uses and print one line per file.
fn run_scan_cli(
    runtime: &tokio::runtime::Runtime,
    pool: &ExecPool,
    engine: &Arc<dyn StegoEngine>,
    paths: &[String],
) -> Result<()> {
    if paths.is_empty() {
        eprintln!("usage: {APP_NAME} --scan <files...>");
        return Ok(());
    }

    // Submit everything up front; the pool bounds actual concurrency.
    let handles: Vec<_> = paths
        .iter()
        .map(|path| {
            let spec = TaskSpec::new(
                vec![Utf8PathBuf::from(path)],
                TaskParams::Analyze(AnalyzeParams::default()),
            );
            (path.clone(), pool.submit(spec, Arc::clone(engine)))
        })
        .collect();

    runtime.block_on(async move {
        for (path, handle) in handles {
            match handle.join().await {
                TaskOutcome::Completed(OperationOutput::Analyzed(report)) => {
                    let flags: Vec<String> = report
                        .flags
                        .iter()
                        .map(|(name, score)| format!("{name}={score:.3}"))
                        .collect();
                    println!(
                        "{path}: risk={} flags=[{}]",
                        report.risk_score,
                        flags.join(", ")
                    );
                }
                TaskOutcome::Completed(other) => {
                    println!("{path}: unexpected result: {}", other.summary());
                }
                TaskOutcome::Failed(message) => println!("{path}: failed ({message})"),
                TaskOutcome::Cancelled => println!("{path}: cancelled"),
            }
        }
    });

    Ok(())
}
