//! Client context shared across workflow invocations.
//!
//! [`ClientCtx`] carries the HTTP client, backend, normalized base URL and
//! configuration. Construct it once and hand it to every
//! [`RecipeWorkflow`](crate::workflow::RecipeWorkflow); it holds no per-job
//! state, so concurrent workflows can share it freely.

use crate::backend::{Backend, HttpBackend};
use crate::config::ClientConfig;
use crate::error::{Result, WorkflowError};
use crate::poll::{JobPoller, TerminalPolicy};
use crate::submit::JobSubmissionClient;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Shared context for submission and polling.
///
/// # Example
///
/// ```
/// use recipe_jobs::ClientCtx;
/// use std::time::Duration;
///
/// let ctx = ClientCtx::builder("http://127.0.0.1:8000/")
///     .poll_interval(Duration::from_millis(500))
///     .poll_timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// assert_eq!(ctx.base_url, "http://127.0.0.1:8000");
/// ```
#[derive(Clone)]
pub struct ClientCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Job server root without trailing slash or `/jobs` suffix.
    pub base_url: String,
    /// HTTP backend. Default: [`HttpBackend`].
    pub backend: Arc<dyn Backend>,
    pub config: ClientConfig,
}

impl ClientCtx {
    /// Create a new builder starting from default configuration.
    pub fn builder(base_url: impl Into<String>) -> ClientCtxBuilder {
        ClientCtxBuilder {
            client: None,
            backend: None,
            config: ClientConfig {
                base_url: base_url.into(),
                ..ClientConfig::default()
            },
        }
    }

    /// Build a context straight from a loaded [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientCtxBuilder {
            client: None,
            backend: None,
            config,
        }
        .build()
    }

    pub fn submitter(&self) -> JobSubmissionClient {
        JobSubmissionClient::new(self)
    }

    pub fn poller(&self) -> JobPoller {
        JobPoller::new(self)
    }
}

impl std::fmt::Debug for ClientCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCtx")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`ClientCtx`].
pub struct ClientCtxBuilder {
    client: Option<Client>,
    backend: Option<Arc<dyn Backend>>,
    config: ClientConfig,
}

impl ClientCtxBuilder {
    /// Set the HTTP client. If not set, one is built with the request timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the HTTP backend. Default: [`HttpBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Fixed delay between status requests. Default: 1 second.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = millis(interval);
        self
    }

    /// Overall polling budget. Default: 120 seconds.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout_ms = millis(timeout);
        self
    }

    /// Per-request timeout. Default: 30 seconds.
    ///
    /// Also applied to the built client unless a custom one is supplied
    /// through [`client`](Self::client).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = millis(timeout);
        self
    }

    pub fn max_parallel_loads(mut self, n: usize) -> Self {
        self.config.max_parallel_loads = n;
        self
    }

    pub fn terminal_policy(mut self, policy: TerminalPolicy) -> Self {
        self.config.terminal_policy = policy;
        self
    }

    /// Validate the configuration and build the context.
    pub fn build(self) -> Result<ClientCtx> {
        self.config.validate()?;
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.config.request_timeout())
                .build()
                .map_err(|e| WorkflowError::InvalidConfig(format!("HTTP client: {}", e)))?,
        };
        let base_url = normalize_base_url(&self.config.base_url);
        Ok(ClientCtx {
            client,
            base_url,
            backend: self.backend.unwrap_or_else(|| Arc::new(HttpBackend)),
            config: self.config,
        })
    }
}

/// Whole milliseconds, rounded up so a nonzero duration never becomes zero.
fn millis(d: Duration) -> u64 {
    let ms = d.as_millis() + u128::from(d.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Strip trailing slashes and a trailing `/jobs` so endpoint paths are not doubled.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/jobs")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}
