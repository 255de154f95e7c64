//! Create-job request.
//!
//! [`JobSubmissionClient::submit`] makes exactly one `POST {base}/jobs` per
//! call. It never retries: the server has no idempotency key, so a second
//! attempt could create a duplicate job. Retrying is the caller's call.

use crate::backend::{Backend, HttpRequest};
use crate::cancel::CancelFlag;
use crate::ctx::ClientCtx;
use crate::error::SubmissionError;
use crate::multipart::MultipartRequest;
use crate::types::{JobAccepted, JobId};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest slice of a rejected body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Posts encoded multipart bodies to the job queue.
#[derive(Clone)]
pub struct JobSubmissionClient {
    client: Client,
    backend: Arc<dyn Backend>,
    base_url: String,
    request_timeout: Duration,
}

impl JobSubmissionClient {
    pub fn new(ctx: &ClientCtx) -> Self {
        Self {
            client: ctx.client.clone(),
            backend: Arc::clone(&ctx.backend),
            base_url: ctx.base_url.clone(),
            request_timeout: ctx.config.request_timeout(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/jobs", self.base_url)
    }

    /// Submit one job and return the id the server assigned.
    ///
    /// Fails with [`SubmissionError::BadInput`] before touching the network
    /// if the request carries no attachments.
    pub async fn submit(
        &self,
        request: &MultipartRequest,
        cancel: Option<&CancelFlag>,
    ) -> Result<JobId, SubmissionError> {
        if request.attachment_count == 0 {
            return Err(SubmissionError::BadInput);
        }
        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(SubmissionError::Cancelled);
        }

        let http = HttpRequest::post(self.endpoint(), request.content_type(), request.body.clone())
            .with_timeout(self.request_timeout);
        debug!(
            url = %http.url,
            files = request.attachment_count,
            bytes = request.body.len(),
            "submitting job"
        );

        let send = self.backend.send(&self.client, &http);
        let result = match cancel {
            Some(flag) => tokio::select! {
                r = send => r,
                _ = flag.cancelled() => return Err(SubmissionError::Cancelled),
            },
            None => send.await,
        };

        let resp = result.map_err(|e| {
            warn!(error = %e, "job submission failed at transport level");
            SubmissionError::Transport(e.to_string())
        })?;

        if !resp.is_success() {
            warn!(status = resp.status, "job submission rejected");
            return Err(SubmissionError::ServerRejected {
                status: resp.status,
                body: truncate_body(&resp.body),
            });
        }

        let accepted: JobAccepted = serde_json::from_str(&resp.body)
            .map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;
        info!(job_id = %accepted.job_id, status = %accepted.status, "job created");
        Ok(accepted.job_id)
    }
}

impl std::fmt::Debug for JobSubmissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubmissionClient")
            .field("endpoint", &self.endpoint())
            .field("backend", &self.backend.name())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Method, MockBackend, MockReply};
    use crate::multipart::{encode, Attachment};

    fn setup(replies: Vec<MockReply>) -> (Arc<MockBackend>, JobSubmissionClient) {
        let mock = Arc::new(MockBackend::new(replies));
        let ctx = ClientCtx::builder("http://jobs.test/")
            .backend(mock.clone())
            .build()
            .unwrap();
        (mock, ctx.submitter())
    }

    fn one_photo() -> MultipartRequest {
        encode(&[("recipe_name", "Pancakes")], &[Attachment::jpeg(0, vec![0xFF, 0xD8, 0xFF])]).unwrap()
    }

    #[tokio::test]
    async fn test_submit_success_201() {
        let (mock, client) = setup(vec![MockReply::json(201, r#"{"job_id":"job-42","status":"pending"}"#)]);
        let req = one_photo();

        let id = client.submit(&req, None).await.unwrap();
        assert_eq!(id, JobId::new("job-42"));

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].url, "http://jobs.test/jobs");
        assert_eq!(sent[0].header("Content-Type"), Some(req.content_type().as_str()));
        assert_eq!(sent[0].header("Accept"), Some("application/json"));
        assert_eq!(sent[0].body, req.body);
    }

    #[tokio::test]
    async fn test_submit_no_attachments_makes_no_call() {
        let (mock, client) = setup(vec![MockReply::json(201, "{}")]);
        let req = encode(&[("recipe_name", "Nothing")], &[]).unwrap();

        let err = client.submit(&req, None).await.unwrap_err();
        assert_eq!(err, SubmissionError::BadInput);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_server_rejected() {
        let (_, client) = setup(vec![MockReply::json(500, "internal error")]);
        let err = client.submit(&one_photo(), None).await.unwrap_err();
        assert_eq!(
            err,
            SubmissionError::ServerRejected {
                status: 500,
                body: "internal error".into()
            }
        );
    }

    #[tokio::test]
    async fn test_submit_malformed_response() {
        let (_, client) = setup(vec![MockReply::json(200, r#"{"id":"missing job_id"}"#)]);
        let err = client.submit(&one_photo(), None).await.unwrap_err();
        assert!(matches!(err, SubmissionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_submit_transport_failure() {
        let (mock, client) = setup(vec![MockReply::connection_reset()]);
        let err = client.submit(&one_photo(), None).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Transport(ref m) if m.contains("connection reset")));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_cancel_interrupts_in_flight_request() {
        let (_, client) = setup(vec![
            MockReply::json(201, r#"{"job_id":"j","status":"pending"}"#).delayed(Duration::from_secs(20)),
        ]);
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = client.submit(&one_photo(), Some(&cancel)).await.unwrap_err();
        assert_eq!(err, SubmissionError::Cancelled);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(600);
        let t = truncate_body(&long);
        assert!(t.ends_with("..."));
        assert!(t.len() <= MAX_ERROR_BODY + 3);
    }
}
