//! Upgradable building with geometric cost, income and energy curves

use crate::core::config::{hours_to_millis, BuildingType};
use crate::core::types::{Millis, Resources};
use crate::economy::energy::EnergyGrid;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a building, derived from its level and upgrade flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingState {
    /// Level 0, first upgrade cycle in flight - not yet producing
    UnderConstruction,
    /// Idle at its current level, may be upgraded
    Active,
    /// Producing at its current level while the next level is being built
    Upgrading,
}

/// One building owned by a player.
///
/// The type definition is an immutable copy of the catalog entry.
#[derive(Debug, Clone)]
pub struct Building {
    name: String,
    kind: BuildingType,
    level: u32,
    upgrading: bool,
    /// Current absolute energy contribution (signed)
    energy: f64,
    /// Clock time at which the in-flight upgrade completes
    upgrade_due_ms: Option<Millis>,
}

impl Building {
    /// Construct a new building; it starts under construction
    pub fn new(name: impl Into<String>, kind: BuildingType) -> Self {
        Self {
            name: name.into(),
            kind,
            level: 0,
            upgrading: true,
            energy: 0.0,
            upgrade_due_ms: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &BuildingType {
        &self.kind
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrading
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn upgrade_due_ms(&self) -> Option<Millis> {
        self.upgrade_due_ms
    }

    pub fn state(&self) -> BuildingState {
        match (self.level, self.upgrading) {
            (0, _) => BuildingState::UnderConstruction,
            (_, true) => BuildingState::Upgrading,
            (_, false) => BuildingState::Active,
        }
    }

    pub fn is_producer(&self) -> bool {
        self.kind.energy.is_some_and(|e| e.is_producer())
    }

    /// Cost of a building type at `level`.
    ///
    /// Level 0 is the purchase price and charges `initial` unchanged;
    /// `level >= 1` charges `initial * base^(level - 1)`.
    pub fn cost_at(kind: &BuildingType, level: u32) -> Resources {
        if level == 0 {
            return kind.cost.initial;
        }
        let factor = kind.cost.base.powi(level as i32 - 1);
        kind.cost.initial.scaled(factor)
    }

    /// Cost to advance from the current level to the next
    pub fn upgrade_cost(&self) -> Resources {
        Self::cost_at(&self.kind, self.level)
    }

    /// Hours needed to build the pending level: metal+crystal of its cost
    /// divided by the construction throughput
    pub fn construction_hours(&self, throughput: f64) -> f64 {
        self.upgrade_cost().structural() / throughput
    }

    pub fn construction_millis(&self, throughput: f64) -> Millis {
        hours_to_millis(self.construction_hours(throughput))
    }

    /// Mark an upgrade cycle as started; `due_ms` is when it completes.
    ///
    /// The caller has already checked `is_upgrading()` and charged the cost.
    pub(crate) fn begin_upgrade(&mut self, due_ms: Millis) {
        self.upgrading = true;
        self.upgrade_due_ms = Some(due_ms);
    }

    /// Finish the in-flight upgrade: clear the flag, bump the level, then
    /// move the energy contribution to the new level. Returns the new level.
    pub(crate) fn complete_upgrade(&mut self, grid: &mut EnergyGrid) -> u32 {
        self.upgrading = false;
        self.upgrade_due_ms = None;
        self.level += 1;
        self.adjust_energy(grid);
        self.level
    }

    /// Replace this building's contribution in `grid` with the value for its
    /// current level. The old value is always withdrawn before the new one is
    /// deposited.
    pub(crate) fn adjust_energy(&mut self, grid: &mut EnergyGrid) {
        let Some(curve) = self.kind.energy else {
            return;
        };
        let producer = curve.is_producer();
        grid.withdraw(self.energy, producer);
        self.energy = Self::energy_at(&self.kind, self.level);
        grid.deposit(self.energy, producer);
    }

    /// Energy of a building type at `level`: `initial * level * base^level`
    pub fn energy_at(kind: &BuildingType, level: u32) -> f64 {
        kind.energy.map_or(0.0, |curve| {
            curve.initial * level as f64 * curve.base.powi(level as i32)
        })
    }

    /// Unthrottled hourly income at `level`: `initial * level * base^level`
    pub fn nominal_rate_at(kind: &BuildingType, level: u32) -> Resources {
        kind.income.map_or(Resources::ZERO, |curve| {
            curve
                .initial
                .scaled(level as f64 * curve.base.powi(level as i32))
        })
    }

    /// Hourly income at the current level, throttled by the energy grid
    pub fn rate(&self, grid: &EnergyGrid) -> Resources {
        if self.kind.income.is_none() {
            return Resources::ZERO;
        }
        Self::nominal_rate_at(&self.kind, self.level).scaled(grid.availability_factor())
    }

    /// Change in throttled income caused by the most recent level change.
    ///
    /// Compares the current level with the one below it under the current
    /// energy factor; zero while under construction.
    pub fn rate_delta(&self, grid: &EnergyGrid) -> Resources {
        if self.level == 0 {
            return Resources::ZERO;
        }
        let mut delta = Self::nominal_rate_at(&self.kind, self.level);
        delta -= Self::nominal_rate_at(&self.kind, self.level - 1);
        delta.scaled(grid.availability_factor())
    }

    /// Change in energy contribution caused by the most recent level change
    pub fn energy_delta(&self) -> f64 {
        if self.level == 0 {
            return 0.0;
        }
        Self::energy_at(&self.kind, self.level) - Self::energy_at(&self.kind, self.level - 1)
    }

    pub fn has_income(&self) -> bool {
        self.kind.income.is_some()
    }
}
