use crate::core::types::Resources;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Player already exists: {0}")]
    DuplicatePlayer(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Insufficient resources: short {shortfall}")]
    InsufficientResources { shortfall: Resources },

    #[error("Build in progress: {building}")]
    UpgradeInProgress { building: String },

    #[error("Unknown building type: {0}")]
    UnknownBuildingType(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures while loading the game configuration. All of these abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
