//! Game configuration: the building catalog and global parameters
//!
//! Loaded once at startup from TOML or JSON and never mutated afterwards.
//! A configuration that fails [`GameConfig::validate`] must abort startup.

use crate::core::error::ConfigError;
use crate::core::types::{Millis, Resources};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Milliseconds in one hour; every hourly rate is converted through this.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Default tick length of the reference game (one second)
pub const DEFAULT_TICK_LENGTH_MS: Millis = 1000;

/// Default construction throughput in metal+crystal per hour
pub const DEFAULT_CONSTRUCTION_THROUGHPUT: f64 = 2500.0;

/// Geometric cost curve: `initial * base^(level - 1)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    pub initial: Resources,
    pub base: f64,
}

/// Geometric income curve: `initial * level * base^level` per hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomeCurve {
    pub initial: Resources,
    pub base: f64,
}

/// Energy curve: `initial * level * base^level`.
///
/// A positive `initial` marks a producer, anything else a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCurve {
    pub initial: f64,
    pub base: f64,
}

impl EnergyCurve {
    pub fn is_producer(&self) -> bool {
        self.initial > 0.0
    }
}

/// Immutable template for one kind of building
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingType {
    pub cost: CostCurve,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<IncomeCurve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyCurve>,
}

/// Global tunables shared by every player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Passive hourly income every player receives
    #[serde(alias = "defaultResourceRate")]
    pub default_resource_rate: Resources,
    /// Ledger contents of a freshly created player
    #[serde(alias = "startingResources")]
    pub starting_resources: Resources,
    #[serde(default = "default_tick_length", alias = "tickLength")]
    pub tick_length_ms: Millis,
    /// Metal+crystal worth of construction finished per hour
    #[serde(default = "default_throughput", alias = "constructionThroughput")]
    pub construction_throughput: f64,
}

fn default_tick_length() -> Millis {
    DEFAULT_TICK_LENGTH_MS
}

fn default_throughput() -> f64 {
    DEFAULT_CONSTRUCTION_THROUGHPUT
}

/// Catalog of building types keyed by display name
pub type BuildingTypeCatalog = BTreeMap<String, BuildingType>;

/// Complete game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(alias = "buildingTypes")]
    pub building_types: BuildingTypeCatalog,
    pub params: Params,
}

impl GameConfig {
    /// Load and validate a configuration file; `.toml` and `.json` are accepted
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::parse_toml(&content),
            Some("json") => Self::parse_json(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Parse and validate a TOML configuration
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration
    pub fn parse_json(content: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn building_type(&self, name: &str) -> Option<&BuildingType> {
        self.building_types.get(name)
    }

    pub fn tick_length(&self) -> TickLength {
        TickLength::new(self.params.tick_length_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.building_types.is_empty() {
            return Err(ConfigError::Invalid("building catalog is empty".into()));
        }

        let p = &self.params;
        if p.tick_length_ms == 0 {
            return Err(ConfigError::Invalid("tick_length_ms must be positive".into()));
        }
        if !(p.construction_throughput.is_finite() && p.construction_throughput > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "construction_throughput ({}) must be positive",
                p.construction_throughput
            )));
        }
        check_quantities("params.default_resource_rate", &p.default_resource_rate)?;
        check_quantities("params.starting_resources", &p.starting_resources)?;

        for (name, ty) in &self.building_types {
            check_quantities(&format!("{name}.cost.initial"), &ty.cost.initial)?;
            check_base(&format!("{name}.cost.base"), ty.cost.base)?;
            if let Some(income) = &ty.income {
                check_quantities(&format!("{name}.income.initial"), &income.initial)?;
                check_base(&format!("{name}.income.base"), income.base)?;
            }
            if let Some(energy) = &ty.energy {
                if !energy.initial.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "{name}.energy.initial must be finite"
                    )));
                }
                check_base(&format!("{name}.energy.base"), energy.base)?;
            }
        }

        Ok(())
    }
}

fn check_quantities(field: &str, values: &Resources) -> Result<(), ConfigError> {
    if !values.is_finite() || !values.is_non_negative() {
        return Err(ConfigError::Invalid(format!(
            "{field} must be finite and non-negative"
        )));
    }
    Ok(())
}

fn check_base(field: &str, base: f64) -> Result<(), ConfigError> {
    if !(base.is_finite() && base > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "{field} ({base}) must be positive"
        )));
    }
    Ok(())
}

/// Length of one simulation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickLength {
    ms: Millis,
}

impl TickLength {
    pub fn new(ms: Millis) -> Self {
        Self { ms }
    }

    pub fn millis(&self) -> Millis {
        self.ms
    }

    /// Tick length expressed in hours
    pub fn hours(&self) -> f64 {
        self.ms as f64 / MILLIS_PER_HOUR
    }

    /// Amount an hourly rate yields over one tick
    pub fn per_tick(&self, hourly: &Resources) -> Resources {
        hourly.scaled(self.hours())
    }
}

/// Convert a duration in hours to clock milliseconds, rounded to the nearest ms
pub fn hours_to_millis(hours: f64) -> Millis {
    (hours * MILLIS_PER_HOUR).round().max(0.0) as Millis
}
