use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;

use crate::error::{UamError, UamResult};

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_QUEUE_NAME: &str = "default";
const DEFAULT_ATTEMPT_LAUNCH_TIMEOUT_MS: u64 = 10_000;

/// Configuration for the UAM client.
///
/// Transport and security knobs are not interpreted here; they are
/// forwarded to the proxy factory as part of the config value.
#[serde_inline_default]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UamConfig {
    /// Polling cadence against the client protocol while waiting for the
    /// application attempt to launch.
    #[serde_inline_default(DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Queue the placeholder application is submitted to when the
    /// constructor queue name is blank.
    #[serde_inline_default(DEFAULT_QUEUE_NAME.to_string())]
    pub default_queue_name: String,

    /// Overall wall-clock bound on waiting for the attempt to reach the
    /// launched state. The poll interval is not clamped to this bound: a
    /// poll interval larger than the timeout observes no progress before
    /// timing out.
    #[serde_inline_default(DEFAULT_ATTEMPT_LAUNCH_TIMEOUT_MS)]
    pub attempt_launch_timeout_ms: u64,
}

impl Default for UamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_queue_name: DEFAULT_QUEUE_NAME.to_string(),
            attempt_launch_timeout_ms: DEFAULT_ATTEMPT_LAUNCH_TIMEOUT_MS,
        }
    }
}

impl UamConfig {
    pub fn from_path(path: &str) -> UamResult<UamConfig> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| UamError::InvalidArgument(format!("cannot read config {path}: {e}")))?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> UamResult<UamConfig> {
        let config: UamConfig = serde_saphyr::from_str(config_str)
            .map_err(|e| UamError::InvalidArgument(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> UamResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(UamError::InvalidArgument(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_queue_name.trim().is_empty() {
            return Err(UamError::InvalidArgument(
                "default_queue_name must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn attempt_launch_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_launch_timeout_ms)
    }
}
