use fleet_config::ConfigError;
use fleet_core::CoreError;
use thiserror::Error;

/// Error type surfaced by the application facade.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl FleetError {
    /// The core error behind this failure, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            FleetError::Core(err) => Some(err),
            _ => None,
        }
    }
}
