//! Kiosk configuration.
//!
//! Defaults match the deployed kiosk: backend on `127.0.0.1:8090`, detail
//! view polling every 500 ms, list view every 1000 ms, 10 character badges,
//! fire-and-forget commands.
//!
//! # Example Config (YAML, `yaml` feature)
//!
//! ```yaml
//! base_url: "http://10.0.0.5:8090"
//! request_timeout_secs: 5
//! detail_poll_interval_ms: 500
//! list_poll_interval_ms: 1000
//! min_credential_len: 10
//! recover_from_error: true
//! command_policy:
//!   retry:
//!     attempts: 3
//!     backoff_ms: 1000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DETAIL_POLL_INTERVAL_MS, LIST_POLL_INTERVAL_MS,
    MIN_CREDENTIAL_LEN,
};

/// Environment variable overriding [`KioskConfig::base_url`].
pub const BASE_URL_ENV: &str = "EVSE_KIOSK_BASE_URL";

/// What the controller does with the result of a start/stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPolicy {
    /// Dispatch and never look at the outcome
    #[default]
    FireAndForget,

    /// Await the outcome, retrying failures, and report it in the session view
    Retry {
        /// Total attempts including the first
        attempts: u32,
        /// Delay between attempts in milliseconds
        backoff_ms: u64,
    },
}

/// Kiosk settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Backend base URL
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Status poll cadence of an open detail view
    pub detail_poll_interval_ms: u64,
    /// Active id poll cadence of the list view
    pub list_poll_interval_ms: u64,
    /// Characters needed to complete a badge read
    pub min_credential_len: usize,
    /// Start/stop command handling
    pub command_policy: CommandPolicy,
    /// Leave `Error` mode on the next successful poll
    pub recover_from_error: bool,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            detail_poll_interval_ms: DETAIL_POLL_INTERVAL_MS,
            list_poll_interval_ms: LIST_POLL_INTERVAL_MS,
            min_credential_len: MIN_CREDENTIAL_LEN,
            command_policy: CommandPolicy::FireAndForget,
            recover_from_error: false,
        }
    }
}

impl KioskConfig {
    /// Defaults, with the base URL taken from `EVSE_KIOSK_BASE_URL` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        config
    }

    /// Load and validate a config from a YAML file.
    #[cfg(feature = "yaml")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a config from a YAML string. Missing keys take defaults.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the controller cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url cannot be empty".to_string()));
        }
        if self.detail_poll_interval_ms == 0 || self.list_poll_interval_ms == 0 {
            return Err(Error::Config("poll intervals must be non-zero".to_string()));
        }
        if self.min_credential_len == 0 {
            return Err(Error::Config(
                "min_credential_len must be at least 1".to_string(),
            ));
        }
        if let CommandPolicy::Retry { attempts: 0, .. } = self.command_policy {
            return Err(Error::Config(
                "command_policy.retry.attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Detail view poll cadence (clamped to at least 1 ms).
    pub fn detail_poll_interval(&self) -> Duration {
        Duration::from_millis(self.detail_poll_interval_ms.max(1))
    }

    /// List view poll cadence (clamped to at least 1 ms).
    pub fn list_poll_interval(&self) -> Duration {
        Duration::from_millis(self.list_poll_interval_ms.max(1))
    }
}
