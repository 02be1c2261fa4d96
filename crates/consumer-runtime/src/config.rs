//! Consumer configuration.

use crate::error::ConfigurationError;
use serde::Deserialize;
use std::time::Duration;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

fn default_max_messages() -> u32 {
    10
}

fn default_visibility_timeout_secs() -> u64 {
    150
}

fn default_heartbeat_interval_secs() -> u64 {
    60
}

fn default_wait_time_secs() -> u64 {
    20
}

fn default_forever() -> bool {
    true
}

/// Configuration for consuming a queue.
///
/// All fields carry serde defaults, so a partially specified file or
/// environment produces a valid configuration. Durations are expressed in
/// whole seconds, which is the granularity queue backends accept for
/// visibility windows and long-poll waits.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// URL or identity of the target queue
    #[serde(default)]
    pub queue_url: String,

    /// Maximum number of messages to request per receive call
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,

    /// Visibility window applied on receive and on every heartbeat renewal
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Interval between visibility renewals; must be strictly less than the
    /// visibility window or messages can reappear mid-processing
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Long-poll wait time for receive calls
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,

    /// Continue polling when the queue is empty instead of returning
    #[serde(default = "default_forever")]
    pub forever: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            max_messages: default_max_messages(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            wait_time_secs: default_wait_time_secs(),
            forever: default_forever(),
        }
    }
}

impl ConsumerConfig {
    /// Load configuration from an optional TOML file plus environment
    /// overrides.
    ///
    /// Sources (applied in order — later sources override earlier ones):
    ///  1. The file at `path`, when given (absent files are not an error)
    ///  2. Environment variables prefixed `CONSUMER__`
    ///     (double-underscore separator), e.g. `CONSUMER__MAX_MESSAGES=5`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parsing`] for malformed sources and
    /// [`ConfigurationError::Invalid`] when the merged result fails
    /// [`validate`](Self::validate).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("CONSUMER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|error| ConfigurationError::Parsing {
                message: error.to_string(),
            })?;

        let config: Self =
            settings
                .try_deserialize()
                .map_err(|error| ConfigurationError::Parsing {
                    message: error.to_string(),
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that field defaults alone cannot guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Missing`] when `queue_url` is empty and
    /// [`ConfigurationError::Invalid`] when `max_messages` is zero or the
    /// heartbeat interval is not strictly less than the visibility window.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queue_url.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "queue_url".to_string(),
            });
        }

        if self.max_messages == 0 {
            return Err(ConfigurationError::Invalid {
                message: "max_messages must be at least 1".to_string(),
            });
        }

        if self.heartbeat_interval_secs >= self.visibility_timeout_secs {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "heartbeat_interval ({}s) must be strictly less than visibility_timeout ({}s)",
                    self.heartbeat_interval_secs, self.visibility_timeout_secs
                ),
            });
        }

        Ok(())
    }

    /// Visibility window as a duration
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    /// Heartbeat interval as a duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Long-poll wait time as a duration
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }
}
