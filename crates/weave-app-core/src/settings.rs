// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted settings of a history view.

use serde::{Deserialize, Serialize};
use tracing::debug;
use weave_core::{GraphConfig, DEFAULT_KEYFRAME_INTERVAL};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Settings controlling how lane graphs are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Rows between keyframes saved while weaving. Must be positive.
    pub keyframe_interval: usize,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
        }
    }
}

impl WeaveConfig {
    /// Key the settings are stored under.
    pub const STORE_KEY: &'static str = "weave";

    /// Rejects settings the graph builder cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyframe_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "keyframe_interval",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Graph build settings derived from these settings.
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            keyframe_interval: self.keyframe_interval,
        }
    }

    /// Loads and validates the settings; missing settings yield the defaults.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        let config: Self = service.load_or_default(Self::STORE_KEY)?;
        config.validate()?;
        debug!(keyframe_interval = config.keyframe_interval, "loaded weave settings");
        Ok(config)
    }

    /// Validates and stores the settings.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        self.validate()?;
        service.save(Self::STORE_KEY, self)
    }
}
