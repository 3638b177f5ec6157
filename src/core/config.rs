use serde::{Deserialize, Serialize};

use super::errors::{LoaderError, Result};

/// Loader configuration shared by every node of a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Capture a stack trace when a unit panic is recovered
    pub capture_backtrace: bool,
    /// Upper bound on the logged stack trace, in bytes
    pub max_backtrace_bytes: usize,
    /// Emit one event per dispatched path
    pub log_paths: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            capture_backtrace: true,
            max_backtrace_bytes: 1 << 18,
            log_paths: true,
        }
    }
}

impl LoaderConfig {
    /// Create a new builder for LoaderConfig
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.capture_backtrace && self.max_backtrace_bytes == 0 {
            return Err(LoaderError::configuration_field(
                "max_backtrace_bytes must be greater than 0 when capture_backtrace is enabled",
                "max_backtrace_bytes",
            ));
        }
        Ok(())
    }

    /// Quiet configuration for tests: no per-path events, short traces
    pub fn development() -> Self {
        Self {
            max_backtrace_bytes: 16 * 1024,
            log_paths: false,
            ..Default::default()
        }
    }
}

/// Builder for LoaderConfig
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    pub fn capture_backtrace(mut self, enabled: bool) -> Self {
        self.config.capture_backtrace = enabled;
        self
    }

    pub fn max_backtrace_bytes(mut self, bytes: usize) -> Self {
        self.config.max_backtrace_bytes = bytes;
        self
    }

    pub fn log_paths(mut self, enabled: bool) -> Self {
        self.config.log_paths = enabled;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<LoaderConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for LoaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
