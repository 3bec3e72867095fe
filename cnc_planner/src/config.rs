//! TOML configuration loader with validation.
//!
//! One file carries `[shared]`, `[planner]` and `[kinematics]`. The planner
//! and kinematics sections may be omitted entirely; every field falls back
//! to its default.

use std::path::Path;

use cnc_common::config::{ConfigError, ConfigLoader, SharedConfig};
use cnc_common::planner::config::{KinematicsConfig, PlannerConfig};
use serde::Deserialize;
use tracing::debug;

/// Complete validated configuration bundle, ready for runtime use.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadedConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub kinematics: KinematicsConfig,
}

impl LoadedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.planner
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("[planner] {e}")))?;
        self.kinematics
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("[kinematics] {e}")))?;
        Ok(())
    }
}

/// Load and validate the planner configuration file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let config = LoadedConfig::load(path)?;
    config.validate()?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(toml: &str) -> Result<LoadedConfig, ConfigError> {
    let config = LoadedConfig::from_toml(toml)?;
    config.validate()?;
    Ok(config)
}
