//! Viewport configuration, loadable from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::components::{GridDimensions, SimulationParameters};
use crate::evolution::EvolutionSchedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Base URL of the simulation service.
    pub service_url: String,
    /// Initial population settings; `world_height`/`world_width` size the grid.
    pub parameters: SimulationParameters,
    pub schedule: EvolutionSchedule,
    /// Maximum evolve-step requests in flight. 1 means strictly sequential.
    pub concurrency: usize,
    pub request_timeout_ms: u64,
    /// Push the grid size to the service whenever the grid is resized.
    pub sync_world_size: bool,
    /// Call `/action/start` before an evolution run.
    pub announce_start: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8080".to_string(),
            parameters: SimulationParameters::default(),
            schedule: EvolutionSchedule::default(),
            concurrency: 1,
            request_timeout_ms: 30_000,
            sync_world_size: false,
            announce_start: true,
        }
    }
}

impl ViewportConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ViewportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_url.trim().is_empty() {
            return Err(ConfigError::Invalid("service_url must not be empty".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        let world = self.parameters.world();
        if !world.fits() {
            return Err(ConfigError::Invalid(format!(
                "grid {world} exceeds {} cells",
                GridDimensions::MAX_CELLS
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
