//! Config loading, validation, and conversion.

use super::model::Config;
use crate::error::{Result, WriteLockError};
use crate::locks::AcquireOptions;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(WriteLockError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            WriteLockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| WriteLockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            WriteLockError::Config(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `max_wait_ms` must be positive
    /// - `warn_after_ms` must be positive and not exceed `max_wait_ms`
    pub fn validate(&self) -> Result<()> {
        if self.max_wait_ms == 0 {
            return Err(WriteLockError::Config(
                "config validation failed: max_wait_ms must be greater than 0".to_string(),
            ));
        }

        if self.warn_after_ms == 0 {
            return Err(WriteLockError::Config(
                "config validation failed: warn_after_ms must be greater than 0".to_string(),
            ));
        }

        if self.warn_after_ms > self.max_wait_ms {
            return Err(WriteLockError::Config(format!(
                "config validation failed: warn_after_ms ({}) must not exceed max_wait_ms ({})",
                self.warn_after_ms, self.max_wait_ms
            )));
        }

        Ok(())
    }

    /// Timeouts to pass to `WriteCoordinator::acquire`.
    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions::new(
            Duration::from_millis(self.max_wait_ms),
            Duration::from_millis(self.warn_after_ms),
        )
    }
}
