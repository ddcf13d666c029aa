//! Economy layer - players, buildings, and the energy grid

pub mod building;
pub mod energy;
pub mod player;

pub use building::{Building, BuildingState};
pub use energy::EnergyGrid;
pub use player::{BuildingReport, Player, PlayerSnapshot, UpgradeStarted};
