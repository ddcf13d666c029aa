//! OGame Engine - persistent multiplayer economy simulation
//!
//! Players own buildings that produce resources, draw or generate energy and
//! upgrade over time. [`Universe`] is the synchronous entry point; timers run
//! on a virtual clock advanced either by tests or by the real-time driver.

pub mod core;
pub mod economy;
pub mod simulation;

pub use crate::core::error::{ConfigError, EngineError, Result};
pub use crate::simulation::Universe;
