//! Simulation layer - timer scheduling, the universe, and the real-time driver

pub mod driver;
pub mod scheduler;
pub mod universe;

pub use driver::run_realtime;
pub use scheduler::{Scheduler, Timer, TimerEvent};
pub use universe::Universe;
