//! Client configuration.
//!
//! [`ClientConfig`] holds every tunable of the client. It can come from
//! defaults, environment variables (`RECIPE_JOBS_*`), JSON, or YAML with the
//! `yaml` feature. Turn it into a runnable context with
//! [`ClientCtx::from_config`](crate::ctx::ClientCtx::from_config).

use crate::error::{Result, WorkflowError};
use crate::poll::TerminalPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Tunables for submission and polling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Job server root, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Fixed delay between status requests.
    pub poll_interval_ms: u64,
    /// Overall polling budget, measured from the first status request.
    pub poll_timeout_ms: u64,
    /// Upper bound for any single HTTP request.
    pub request_timeout_ms: u64,
    /// How many image sources are read at once.
    pub max_parallel_loads: usize,
    pub terminal_policy: TerminalPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_ms: 1000,
            poll_timeout_ms: 120_000,
            request_timeout_ms: 30_000,
            max_parallel_loads: 4,
            terminal_policy: TerminalPolicy::DoneOnly,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ClientConfig {
    /// Defaults overridden by `RECIPE_JOBS_*` environment variables.
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            base_url: std::env::var("RECIPE_JOBS_BASE_URL").unwrap_or(default.base_url),
            poll_interval_ms: env_or("RECIPE_JOBS_POLL_INTERVAL_MS", default.poll_interval_ms),
            poll_timeout_ms: env_or("RECIPE_JOBS_POLL_TIMEOUT_MS", default.poll_timeout_ms),
            request_timeout_ms: env_or("RECIPE_JOBS_REQUEST_TIMEOUT_MS", default.request_timeout_ms),
            max_parallel_loads: env_or("RECIPE_JOBS_MAX_PARALLEL_LOADS", default.max_parallel_loads),
            terminal_policy: match std::env::var("RECIPE_JOBS_TERMINAL_POLICY").as_deref() {
                Ok("done_or_failed") => TerminalPolicy::DoneOrFailed,
                _ => default.terminal_policy,
            },
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| WorkflowError::InvalidConfig(format!("bad JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)
            .map_err(|e| WorkflowError::InvalidConfig(format!("bad YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that can never work.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(WorkflowError::InvalidConfig(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if let Err(e) = reqwest::Url::parse(url) {
            return Err(WorkflowError::InvalidConfig(format!(
                "base_url '{}' is not a valid URL: {}",
                self.base_url, e
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.poll_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "poll_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_parallel_loads == 0 {
            return Err(WorkflowError::InvalidConfig(
                "max_parallel_loads must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
