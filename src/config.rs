//! Simulation configuration.
//!
//! Read from a JSON file; every field is optional and falls back to the
//! defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::unit::SIGNAL_DURATION;

mod defaults {
    /// Simulated time units between auto-run injections.
    pub const AUTORUN_PERIOD: u64 = 500;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// How long a unit keeps its signal up after an event.
    pub signal_duration: u64,
    /// Period of the auto-run driver.
    pub autorun_period: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            signal_duration: SIGNAL_DURATION,
            autorun_period: defaults::AUTORUN_PERIOD,
        }
    }
}

impl SimConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text).map_err(|e| SimError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if config.autorun_period == 0 {
            return Err(SimError::Config {
                path: path.display().to_string(),
                message: "autorun_period must be positive".into(),
            });
        }
        Ok(config)
    }
}
