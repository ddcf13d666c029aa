//! Real-time driver: moves the simulation clock along with the wall clock

use crate::simulation::universe::Universe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Advance `universe` by one tick per wall-clock tick until `shutdown`
/// becomes true or its sender is dropped. Returns the number of ticks run.
pub async fn run_realtime(universe: Arc<Universe>, mut shutdown: watch::Receiver<bool>) -> u64 {
    let tick = universe.tick_length();
    let mut ticker = interval(Duration::from_millis(tick.millis()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately
    ticker.tick().await;

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fired = universe.advance_by(tick.millis());
                ticks += 1;
                tracing::trace!(ticks, fired, now_ms = universe.now_ms(), "tick");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(ticks, "realtime driver stopped");
    ticks
}
