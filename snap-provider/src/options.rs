//! Construction options for an adapter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use snap_config::SnapshotConfig;

use crate::digitalocean::StopMethod;
use crate::error::{ProviderError, Result};

fn default_delay() -> u64 {
    10
}

fn default_timeout() -> u64 {
    3600
}

/// Poll interval and wait budget, both in whole seconds.
///
/// Unknown keys are rejected when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterOptions {
    #[serde(default = "default_delay")]
    pub delay: u64,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Cut power instead of asking the OS to shut down.
    #[serde(default)]
    pub stop_by_power: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            timeout: default_timeout(),
            stop_by_power: false,
        }
    }
}

impl AdapterOptions {
    pub fn new(delay: u64, timeout: u64) -> Self {
        Self {
            delay,
            timeout,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn stop_method(&self) -> StopMethod {
        if self.stop_by_power {
            StopMethod::PowerOff
        } else {
            StopMethod::Shutdown
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.delay == 0 {
            return Err(ProviderError::InvalidOptions(
                "delay must be greater than zero".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(ProviderError::InvalidOptions(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.delay > self.timeout {
            return Err(ProviderError::InvalidOptions(format!(
                "delay ({}s) must not exceed timeout ({}s)",
                self.delay, self.timeout
            )));
        }
        Ok(())
    }
}

impl From<&SnapshotConfig> for AdapterOptions {
    fn from(config: &SnapshotConfig) -> Self {
        Self {
            delay: config.delay,
            timeout: config.timeout,
            stop_by_power: config.stop_by_power,
        }
    }
}
