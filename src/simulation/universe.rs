//! Universe: player registry, shared configuration and the timer dispatcher
//!
//! This is the synchronous entry point used by outer layers (CLI, HTTP).
//! Each player sits behind its own mutex; requests and timer firings for
//! the same player serialize on it while different players never contend.
//!
//! Lock order is always player -> scheduler. The registry lock is only held
//! long enough to clone a player handle, except during player creation where
//! it is taken before the scheduler.

use crate::core::config::{GameConfig, TickLength};
use crate::core::error::{EngineError, Result};
use crate::core::types::Millis;
use crate::economy::player::{BuildingReport, Player, PlayerSnapshot};
use crate::simulation::scheduler::{Scheduler, Timer, TimerEvent};
use ahash::AHashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

type PlayerHandle = Arc<Mutex<Player>>;

/// Acquire a mutex, recovering the data if a holder panicked.
///
/// Player mutations validate before they write, so a poisoned guard never
/// exposes a half-applied change.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Universe {
    config: Arc<GameConfig>,
    players: RwLock<AHashMap<String, PlayerHandle>>,
    scheduler: Mutex<Scheduler>,
    /// Serializes clock advancement so timers are dispatched in order
    advancing: Mutex<()>,
}

impl Universe {
    /// Create a universe from a configuration, validating it first
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            building_types = config.building_types.len(),
            tick_length_ms = config.params.tick_length_ms,
            "universe created"
        );
        Ok(Self {
            config: Arc::new(config),
            players: RwLock::new(AHashMap::new()),
            scheduler: Mutex::new(Scheduler::new()),
            advancing: Mutex::new(()),
        })
    }

    /// Load a configuration file and create a universe from it
    pub fn from_path(path: &Path) -> Result<Self> {
        let config = GameConfig::load(path)?;
        Self::new(config)
    }

    /// Read-only building catalog and parameters
    pub fn static_config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick_length(&self) -> TickLength {
        self.config.tick_length()
    }

    /// Register a new player and arm its passive-income timer
    pub fn create_player(&self, name: &str) -> Result<PlayerSnapshot> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        if players.contains_key(name) {
            return Err(EngineError::DuplicatePlayer(name.to_string()));
        }

        let player = Player::new(name, &self.config.params);
        let snapshot = player.state();
        players.insert(name.to_string(), Arc::new(Mutex::new(player)));

        lock(&self.scheduler).schedule_after(
            self.tick_length().millis(),
            TimerEvent::BasicIncome {
                player: name.to_string(),
            },
        );

        tracing::info!(player = name, "player created");
        Ok(snapshot)
    }

    pub fn player_exists(&self, name: &str) -> bool {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of every registered player, sorted
    pub fn player_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn player_handle(&self, name: &str) -> Result<PlayerHandle> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::PlayerNotFound(name.to_string()))
    }

    /// Purchase or upgrade `building` for `player`.
    ///
    /// Payment and timer arming happen under the player's lock, so the
    /// completion timer is only armed once the cost has been charged.
    pub fn upgrade_building(&self, player: &str, building: &str) -> Result<()> {
        let handle = self.player_handle(player)?;
        let kind = self
            .config
            .building_type(building)
            .ok_or_else(|| EngineError::UnknownBuildingType(building.to_string()))?;

        let mut p = lock(&handle);
        let mut scheduler = lock(&self.scheduler);
        let started = p.upgrade(building, kind, scheduler.now_ms())?;

        scheduler.schedule_after(
            started.duration_ms,
            TimerEvent::UpgradeComplete {
                player: player.to_string(),
                building: building.to_string(),
            },
        );
        if started.constructed && started.produces {
            scheduler.schedule_after(
                self.tick_length().millis(),
                TimerEvent::Production {
                    player: player.to_string(),
                    building: building.to_string(),
                },
            );
        }
        Ok(())
    }

    /// Snapshot of one player, taken under its lock
    pub fn player_state(&self, name: &str) -> Result<PlayerSnapshot> {
        let handle = self.player_handle(name)?;
        let p = lock(&handle);
        Ok(p.state())
    }

    /// Telemetry for one building; `None` if the player has not bought it yet
    pub fn building_report(&self, player: &str, building: &str) -> Result<Option<BuildingReport>> {
        let handle = self.player_handle(player)?;
        if self.config.building_type(building).is_none() {
            return Err(EngineError::UnknownBuildingType(building.to_string()));
        }
        let p = lock(&handle);
        Ok(p.building_report(building))
    }

    /// Run `f` against a player under its lock
    pub fn with_player<R>(&self, name: &str, f: impl FnOnce(&Player) -> R) -> Result<R> {
        let handle = self.player_handle(name)?;
        let p = lock(&handle);
        Ok(f(&p))
    }

    /// Current simulation clock
    pub fn now_ms(&self) -> Millis {
        lock(&self.scheduler).now_ms()
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        lock(&self.scheduler).pending()
    }

    /// Advance the clock by `delta_ms`, firing every timer that falls due
    pub fn advance_by(&self, delta_ms: Millis) -> usize {
        let _advancing = lock(&self.advancing);
        // Target is read under the advancing lock so concurrent deltas add up
        let target = self.now_ms() + delta_ms;
        self.advance_to_locked(target)
    }

    /// Advance the clock to `until_ms`, firing every due timer in order.
    /// Returns the number of timers fired.
    pub fn advance_to(&self, until_ms: Millis) -> usize {
        let _advancing = lock(&self.advancing);
        self.advance_to_locked(until_ms)
    }

    /// Caller holds `self.advancing`
    fn advance_to_locked(&self, until_ms: Millis) -> usize {
        let mut fired = 0;

        loop {
            // Scheduler lock is released before the player lock is taken
            let next = lock(&self.scheduler).pop_due(until_ms);
            let Some(timer) = next else {
                break;
            };
            self.dispatch(timer);
            fired += 1;
        }

        lock(&self.scheduler).finish_at(until_ms);
        fired
    }

    fn dispatch(&self, timer: Timer) {
        let handle = match self.player_handle(timer.event.player()) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(%err, "dropping timer for unknown player");
                return;
            }
        };
        let mut player = lock(&handle);

        match &timer.event {
            TimerEvent::BasicIncome { .. } => player.receive_basic_income(),
            TimerEvent::Production { building, .. } => {
                player.produce(building);
            }
            TimerEvent::UpgradeComplete { building, .. } => {
                player.complete_upgrade(building);
            }
        }

        if timer.event.is_recurring() {
            // Re-arm from the previous fire time so no tick is skipped
            lock(&self.scheduler).schedule_at(
                timer.fire_at_ms + self.tick_length().millis(),
                timer.event,
            );
        }
    }
}
