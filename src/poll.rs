//! Deadline-bounded job status polling.
//!
//! [`JobPoller::poll`] issues `GET {base}/jobs/{id}` at a fixed interval until
//! the job reaches a terminal status or the deadline passes.
//!
//! | response                         | outcome                               |
//! |----------------------------------|---------------------------------------|
//! | non-2xx                          | [`PollError::ServerRejected`], stop   |
//! | `status: "done"`                 | return the [`JobStatus`]              |
//! | `status: "failed"` (opt-in)      | [`PollError::JobFailed`], stop        |
//! | any other status                 | sleep `interval`, retry               |
//! | body that does not decode        | sleep `interval`, retry               |
//! | network failure                  | [`PollError::Transport`], stop        |
//!
//! The deadline is absolute. Each request is bounded by the smaller of the
//! per-request timeout and the time left, and sleeps are clipped to the
//! deadline, so polling never overshoots it by more than scheduling jitter.

use crate::backend::{Backend, HttpRequest, TransportError};
use crate::cancel::CancelFlag;
use crate::ctx::ClientCtx;
use crate::error::PollError;
use crate::submit::truncate_body;
use crate::types::{JobId, JobStatus, StatusKind};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Which reported statuses end polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPolicy {
    /// Only `"done"` is terminal. A server-side failure keeps polling until
    /// the deadline.
    #[default]
    DoneOnly,
    /// `"done"` succeeds; `"failed"`/`"error"` stop with [`PollError::JobFailed`].
    DoneOrFailed,
}

enum Verdict {
    Finished(JobStatus),
    Failed(String),
    Continue,
}

impl TerminalPolicy {
    fn judge(self, status: JobStatus) -> Verdict {
        if status.status == StatusKind::Done {
            return Verdict::Finished(status);
        }
        if status.status == StatusKind::Failed && self == TerminalPolicy::DoneOrFailed {
            // Report the server's own word ("failed" or "error").
            let raw = status
                .payload
                .as_deref()
                .and_then(|p| serde_json::from_str::<serde_json::Value>(p).ok())
                .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(String::from))
                .unwrap_or_else(|| status.status.as_str().to_string());
            return Verdict::Failed(raw);
        }
        Verdict::Continue
    }
}

/// Polls one job until it finishes.
#[derive(Clone)]
pub struct JobPoller {
    client: Client,
    backend: Arc<dyn Backend>,
    base_url: String,
    request_timeout: Duration,
    interval: Duration,
    timeout: Duration,
    policy: TerminalPolicy,
}

impl JobPoller {
    pub fn new(ctx: &ClientCtx) -> Self {
        Self {
            client: ctx.client.clone(),
            backend: Arc::clone(&ctx.backend),
            base_url: ctx.base_url.clone(),
            request_timeout: ctx.config.request_timeout(),
            interval: ctx.config.poll_interval(),
            timeout: ctx.config.poll_timeout(),
            policy: ctx.config.terminal_policy,
        }
    }

    pub fn with_policy(mut self, policy: TerminalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `{base}/jobs/{id}`, with the id percent-encoded as one path segment.
    pub fn status_url(&self, job_id: &JobId) -> Result<Url, PollError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PollError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PollError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("jobs")
            .push(job_id.as_str());
        Ok(url)
    }

    /// Poll with the configured interval, deadline starting now.
    pub async fn wait(&self, job_id: &JobId, cancel: Option<&CancelFlag>) -> Result<JobStatus, PollError> {
        self.poll(job_id, Instant::now() + self.timeout, self.interval, cancel)
            .await
    }

    /// Poll until a terminal status, the `deadline`, or the first hard error.
    pub async fn poll(
        &self,
        job_id: &JobId,
        deadline: Instant,
        interval: Duration,
        cancel: Option<&CancelFlag>,
    ) -> Result<JobStatus, PollError> {
        let started = Instant::now();
        let url = self.status_url(job_id)?;
        let mut attempt: u32 = 0;

        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(job_id = %job_id, attempts = attempt, "polling deadline reached");
                return Err(PollError::Timeout {
                    waited: now - started,
                });
            }
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(PollError::Cancelled);
            }

            attempt += 1;
            let budget = (deadline - now).min(self.request_timeout);
            let request = HttpRequest::get(url.as_str()).with_timeout(budget);
            debug!(job_id = %job_id, attempt, "checking job status");

            let send = tokio::time::timeout_at(deadline, self.backend.send(&self.client, &request));
            let outcome = match cancel {
                Some(flag) => tokio::select! {
                    r = send => r,
                    _ = flag.cancelled() => return Err(PollError::Cancelled),
                },
                None => send.await,
            };

            let resp = match outcome {
                Err(_elapsed) => {
                    return Err(PollError::Timeout {
                        waited: Instant::now() - started,
                    })
                }
                Ok(Err(TransportError::Timeout { .. })) if Instant::now() >= deadline => {
                    return Err(PollError::Timeout {
                        waited: Instant::now() - started,
                    })
                }
                Ok(Err(e)) => {
                    warn!(job_id = %job_id, error = %e, "status request failed");
                    return Err(PollError::Transport(e.to_string()));
                }
                Ok(Ok(resp)) => resp,
            };

            if !resp.is_success() {
                warn!(job_id = %job_id, status = resp.status, "status request rejected");
                return Err(PollError::ServerRejected {
                    status: resp.status,
                    body: truncate_body(&resp.body),
                });
            }

            match JobStatus::from_body(&resp.body) {
                Ok(status) => match self.policy.judge(status) {
                    Verdict::Finished(status) => {
                        info!(job_id = %job_id, attempts = attempt, "job finished");
                        return Ok(status);
                    }
                    Verdict::Failed(raw) => {
                        warn!(job_id = %job_id, status = %raw, "job reported failure");
                        return Err(PollError::JobFailed { status: raw });
                    }
                    Verdict::Continue => {}
                },
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "undecodable status body, still polling");
                }
            }

            let wake = (Instant::now() + interval).min(deadline);
            match cancel {
                Some(flag) => tokio::select! {
                    _ = tokio::time::sleep_until(wake) => {}
                    _ = flag.cancelled() => return Err(PollError::Cancelled),
                },
                None => tokio::time::sleep_until(wake).await,
            }
        }
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish()
    }
}
