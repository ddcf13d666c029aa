pub mod config;
pub mod error;
pub mod types;

pub use config::{BuildingType, BuildingTypeCatalog, GameConfig, Params, TickLength};
pub use error::{ConfigError, EngineError, Result};
pub use types::{Millis, ResourceKind, Resources};
