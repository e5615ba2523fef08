//! GUI layer: the Slint window, its controller, and the event-loop bridge.

pub mod bridge;
pub mod controller;

pub use bridge::UiBridge;
pub use controller::{GuiController, InflightTokens};
