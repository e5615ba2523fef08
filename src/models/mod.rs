//! Data structures shared across the application.
//!
//! - [`AppState`]: runtime state snapshot (settings, in-flight operations,
//!   session history) managed by [`crate::state::StateManager`]
//! - [`UserConfig`] / [`UserSettings`]: YAML user configuration loaded by
//!   [`crate::config::ConfigManager`]

pub mod app_state;
pub mod config;

pub use app_state::{AppState, OperationProgress};
pub use config::{UserConfig, UserSettings};
