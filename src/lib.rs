// STEGOSIGHT - steganography workbench scaffold
//
// This is the library crate containing the execution core, engine contract,
// state management, and GUI layer. The binary crate (main.rs) provides the
// entry point.

pub mod config;
pub mod engine;
pub mod exec;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod state;
pub mod ui;
pub mod validation;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{MockEngine, StegoEngine};
pub use exec::{CancelToken, ExecPool, OperationKind, TaskEvent, TaskOutcome, TaskSpec};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
