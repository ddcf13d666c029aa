//! Player: resource ledger, buildings and the energy aggregate
//!
//! Every mutation of a player's state goes through `&mut Player`, so the
//! lock that guards a player is the only synchronization it needs.

use crate::core::config::{BuildingType, Params, TickLength};
use crate::core::error::{EngineError, Result};
use crate::core::types::{Millis, Resources};
use crate::economy::building::{Building, BuildingState};
use crate::economy::energy::EnergyGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of an accepted upgrade request, used to arm timers
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeStarted {
    pub building: String,
    /// Delay until the upgrade completes
    pub duration_ms: Millis,
    /// True when this request purchased the building
    pub constructed: bool,
    /// True when the building needs a production timer
    pub produces: bool,
}

/// Externally visible player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub name: String,
    pub buildings: BTreeMap<String, u32>,
    pub resources: Resources,
    pub resource_rate: Resources,
    pub energy_output: f64,
    pub energy_balance: f64,
}

/// Telemetry for a single building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingReport {
    pub name: String,
    pub level: u32,
    pub state: BuildingState,
    pub upgrading: bool,
    pub upgrade_cost: Resources,
    pub construction_hours: f64,
    pub upgrade_due_ms: Option<Millis>,
    pub energy: f64,
    pub rate: Resources,
    pub rate_delta: Resources,
    pub energy_delta: f64,
}

#[derive(Debug, Clone)]
pub struct Player {
    name: String,
    resources: Resources,
    default_resource_rate: Resources,
    buildings: BTreeMap<String, Building>,
    energy: EnergyGrid,
    tick: TickLength,
    construction_throughput: f64,
}

impl Player {
    /// Create a player seeded from the global parameters
    pub fn new(name: impl Into<String>, params: &Params) -> Self {
        Self {
            name: name.into(),
            resources: params.starting_resources,
            default_resource_rate: params.default_resource_rate,
            buildings: BTreeMap::new(),
            energy: EnergyGrid::new(),
            tick: TickLength::new(params.tick_length_ms),
            construction_throughput: params.construction_throughput,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn energy(&self) -> &EnergyGrid {
        &self.energy
    }

    pub fn energy_output(&self) -> f64 {
        self.energy.output
    }

    pub fn energy_balance(&self) -> f64 {
        self.energy.balance
    }

    pub fn default_resource_rate(&self) -> &Resources {
        &self.default_resource_rate
    }

    pub fn building(&self, name: &str) -> Option<&Building> {
        self.buildings.get(name)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// True iff every component of `costs` is in stock
    pub fn can_afford(&self, costs: &Resources) -> bool {
        self.resources.covers(costs)
    }

    /// Deduct `costs` in full, or nothing at all
    pub fn pay(&mut self, costs: &Resources) -> Result<()> {
        if !self.can_afford(costs) {
            return Err(EngineError::InsufficientResources {
                shortfall: self.resources.shortfall(costs),
            });
        }
        self.resources -= *costs;
        Ok(())
    }

    /// Purchase or upgrade a building.
    ///
    /// A missing building is bought at its initial cost and starts at level
    /// 0; an idle one is charged its current upgrade cost. A building that is
    /// already upgrading is rejected before any payment is attempted.
    pub fn upgrade(
        &mut self,
        name: &str,
        kind: &BuildingType,
        now_ms: Millis,
    ) -> Result<UpgradeStarted> {
        let throughput = self.construction_throughput;

        if let Some(building) = self.buildings.get(name) {
            if building.is_upgrading() {
                return Err(EngineError::UpgradeInProgress {
                    building: name.to_string(),
                });
            }
            let cost = building.upgrade_cost();
            let duration_ms = building.construction_millis(throughput);
            self.pay(&cost)?;

            if let Some(building) = self.buildings.get_mut(name) {
                building.begin_upgrade(now_ms + duration_ms);
                tracing::debug!(
                    player = %self.name,
                    building = name,
                    target_level = building.level() + 1,
                    duration_ms,
                    "upgrade started"
                );
            }
            return Ok(UpgradeStarted {
                building: name.to_string(),
                duration_ms,
                constructed: false,
                produces: false,
            });
        }

        let mut building = Building::new(name, *kind);
        let duration_ms = building.construction_millis(throughput);
        self.pay(&kind.cost.initial)?;
        building.begin_upgrade(now_ms + duration_ms);
        let produces = building.has_income();
        self.buildings.insert(name.to_string(), building);

        tracing::debug!(
            player = %self.name,
            building = name,
            duration_ms,
            "construction started"
        );

        Ok(UpgradeStarted {
            building: name.to_string(),
            duration_ms,
            constructed: true,
            produces,
        })
    }

    /// Upgrade timer fired for `name`. Returns the new level, or `None` if
    /// the building has no upgrade in flight.
    pub fn complete_upgrade(&mut self, name: &str) -> Option<u32> {
        let building = self.buildings.get_mut(name)?;
        if !building.is_upgrading() {
            return None;
        }
        let level = building.complete_upgrade(&mut self.energy);
        tracing::info!(
            player = %self.name,
            building = name,
            level,
            energy_output = self.energy.output,
            energy_balance = self.energy.balance,
            "upgrade complete"
        );
        Some(level)
    }

    /// Passive income for one tick
    pub fn receive_basic_income(&mut self) {
        let income = self.tick.per_tick(&self.default_resource_rate);
        self.resources += income;
        tracing::trace!(player = %self.name, %income, "basic income");
    }

    /// Production timer fired for `name`: credit one tick of its current rate
    pub fn produce(&mut self, name: &str) -> Resources {
        let Some(building) = self.buildings.get(name) else {
            return Resources::ZERO;
        };
        let produced = self.tick.per_tick(&building.rate(&self.energy));
        self.resources += produced;
        tracing::trace!(player = %self.name, building = name, %produced, "production");
        produced
    }

    pub fn building_levels(&self) -> BTreeMap<String, u32> {
        self.buildings
            .iter()
            .map(|(name, b)| (name.clone(), b.level()))
            .collect()
    }

    /// Default hourly rate plus every building's throttled rate
    pub fn resource_rate(&self) -> Resources {
        let mut rate = self.default_resource_rate;
        for building in self.buildings.values() {
            rate += building.rate(&self.energy);
        }
        rate
    }

    /// Consistent snapshot of everything externally visible
    pub fn state(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            name: self.name.clone(),
            buildings: self.building_levels(),
            resources: self.resources,
            resource_rate: self.resource_rate(),
            energy_output: self.energy.output,
            energy_balance: self.energy.balance,
        }
    }

    pub fn building_report(&self, name: &str) -> Option<BuildingReport> {
        let b = self.buildings.get(name)?;
        Some(BuildingReport {
            name: name.to_string(),
            level: b.level(),
            state: b.state(),
            upgrading: b.is_upgrading(),
            upgrade_cost: b.upgrade_cost(),
            construction_hours: b.construction_hours(self.construction_throughput),
            upgrade_due_ms: b.upgrade_due_ms(),
            energy: b.energy(),
            rate: b.rate(&self.energy),
            rate_delta: b.rate_delta(&self.energy),
            energy_delta: b.energy_delta(),
        })
    }

    /// Energy aggregate rebuilt from every building's current contribution
    pub fn recompute_energy(&self) -> EnergyGrid {
        EnergyGrid::recompute(
            self.buildings
                .values()
                .map(|b| (Building::energy_at(b.kind(), b.level()), b.is_producer())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CostCurve, EnergyCurve, IncomeCurve};

    fn params() -> Params {
        Params {
            default_resource_rate: Resources::new(10.0, 0.0, 0.0),
            starting_resources: Resources::new(500.0, 500.0, 0.0),
            tick_length_ms: 3_600_000,
            construction_throughput: 2500.0,
        }
    }

    fn solar() -> BuildingType {
        BuildingType {
            cost: CostCurve {
                initial: Resources::new(75.0, 30.0, 0.0),
                base: 1.5,
            },
            income: None,
            energy: Some(EnergyCurve {
                initial: 20.0,
                base: 1.1,
            }),
        }
    }

    fn mine() -> BuildingType {
        BuildingType {
            cost: CostCurve {
                initial: Resources::new(60.0, 15.0, 0.0),
                base: 1.5,
            },
            income: Some(IncomeCurve {
                initial: Resources::new(30.0, 0.0, 0.0),
                base: 1.1,
            }),
            energy: Some(EnergyCurve {
                initial: -10.0,
                base: 1.1,
            }),
        }
    }

    #[test]
    fn test_new_player_starts_with_configured_resources() {
        let player = Player::new("test", &params());
        assert_eq!(player.resources(), &Resources::new(500.0, 500.0, 0.0));
        assert_eq!(player.energy_output(), 0.0);
        assert_eq!(player.energy_balance(), 0.0);
        assert!(player.building_levels().is_empty());
    }

    #[test]
    fn test_pay_deducts_everything() {
        let mut player = Player::new("test", &params());
        player.pay(&Resources::new(100.0, 50.0, 0.0)).unwrap();
        assert_eq!(player.resources(), &Resources::new(400.0, 450.0, 0.0));
    }

    #[test]
    fn test_pay_failure_leaves_resources_untouched() {
        let mut player = Player::new("test", &params());
        let before = *player.resources();
        let cost = Resources::new(100.0, 600.0, 0.0);
        assert!(!player.can_afford(&cost));

        let err = player.pay(&cost).unwrap_err();
        match err {
            EngineError::InsufficientResources { shortfall } => {
                assert_eq!(shortfall, Resources::new(0.0, 100.0, 0.0));
            }
            other => panic!("Expected InsufficientResources, got {other:?}"),
        }
        assert_eq!(player.resources(), &before);
    }

    #[test]
    fn test_upgrade_purchases_building() {
        let mut player = Player::new("test", &params());
        let started = player.upgrade("Solar Plant", &solar(), 0).unwrap();
        assert!(started.constructed);
        assert!(!started.produces);
        // (75 + 30) / 2500 h
        assert_eq!(started.duration_ms, 151_200);

        let b = player.building("Solar Plant").unwrap();
        assert_eq!(b.level(), 0);
        assert!(b.is_upgrading());
        assert_eq!(b.upgrade_due_ms(), Some(151_200));
        assert_eq!(player.resources(), &Resources::new(425.0, 470.0, 0.0));
    }

    #[test]
    fn test_upgrade_in_progress_is_rejected_without_payment() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        let before = *player.resources();

        let err = player.upgrade("Solar Plant", &solar(), 10).unwrap_err();
        assert!(matches!(err, EngineError::UpgradeInProgress { .. }));
        assert_eq!(player.resources(), &before);
    }

    #[test]
    fn test_unaffordable_purchase_creates_nothing() {
        let mut p = params();
        p.starting_resources = Resources::new(10.0, 10.0, 0.0);
        let mut player = Player::new("poor", &p);

        let err = player.upgrade("Solar Plant", &solar(), 0).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientResources { .. }));
        assert!(player.building("Solar Plant").is_none());
        assert_eq!(player.resources(), &Resources::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_complete_upgrade_adjusts_energy() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        assert_eq!(player.complete_upgrade("Solar Plant"), Some(1));
        assert!((player.energy_output() - 22.0).abs() < 1e-9);
        assert!((player.energy_balance() - 22.0).abs() < 1e-9);

        // Spurious second completion is ignored
        assert_eq!(player.complete_upgrade("Solar Plant"), None);
        assert_eq!(player.building("Solar Plant").unwrap().level(), 1);
    }

    #[test]
    fn test_second_upgrade_charges_level_cost() {
        let mut player = Player::new("test", &params());
        player.upgrade("Metal Mine", &mine(), 0).unwrap();
        player.complete_upgrade("Metal Mine");
        let before = *player.resources();

        let started = player.upgrade("Metal Mine", &mine(), 0).unwrap();
        assert!(!started.constructed);
        let mut expected = before;
        expected -= Resources::new(60.0, 15.0, 0.0);
        assert_eq!(player.resources(), &expected);
    }

    #[test]
    fn test_basic_income_one_hour_tick() {
        let mut player = Player::new("test", &params());
        player.receive_basic_income();
        assert!((player.resources().metal - 510.0).abs() < 1e-9);
        assert_eq!(player.resources().crystal, 500.0);
    }

    #[test]
    fn test_resource_rate_includes_buildings() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        player.upgrade("Metal Mine", &mine(), 0).unwrap();
        // Nothing built yet
        assert_eq!(player.resource_rate(), Resources::new(10.0, 0.0, 0.0));

        player.complete_upgrade("Solar Plant");
        player.complete_upgrade("Metal Mine");
        // Solar 22 output, mine draws 11: fully powered
        let rate = player.resource_rate();
        assert!((rate.metal - (10.0 + 33.0)).abs() < 1e-9);
    }

    #[test]
    fn test_produce_credits_one_tick() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        player.upgrade("Metal Mine", &mine(), 0).unwrap();
        player.complete_upgrade("Solar Plant");
        player.complete_upgrade("Metal Mine");
        let before = player.resources().metal;

        let produced = player.produce("Metal Mine");
        assert!((produced.metal - 33.0).abs() < 1e-9);
        assert!((player.resources().metal - before - 33.0).abs() < 1e-9);
        assert_eq!(player.produce("Nonexistent"), Resources::ZERO);
    }

    #[test]
    fn test_state_snapshot() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        let state = player.state();
        assert_eq!(state.name, "test");
        assert_eq!(state.buildings.get("Solar Plant"), Some(&0));
        assert_eq!(state.resources, *player.resources());
        assert_eq!(state.energy_output, 0.0);

        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("resourceRate").is_some());
        assert!(json.get("energyBalance").is_some());
    }

    #[test]
    fn test_recompute_matches_incremental() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        player.upgrade("Metal Mine", &mine(), 0).unwrap();
        player.complete_upgrade("Solar Plant");
        player.complete_upgrade("Metal Mine");
        player.upgrade("Metal Mine", &mine(), 0).unwrap();
        player.complete_upgrade("Metal Mine");

        let recomputed = player.recompute_energy();
        assert!(player.energy().approx_eq(&recomputed, 1e-9));
    }

    #[test]
    fn test_building_report() {
        let mut player = Player::new("test", &params());
        player.upgrade("Solar Plant", &solar(), 0).unwrap();
        let report = player.building_report("Solar Plant").unwrap();
        assert_eq!(report.state, BuildingState::UnderConstruction);
        assert_eq!(report.upgrade_cost, Resources::new(75.0, 30.0, 0.0));
        assert_eq!(report.upgrade_due_ms, Some(151_200));
        assert!(player.building_report("Metal Mine").is_none());
    }
}
