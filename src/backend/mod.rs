//! HTTP seam between the job clients and the network.
//!
//! The [`Backend`] trait sends one normalized [`HttpRequest`] and returns the
//! status and body. Status interpretation stays with the callers
//! ([`JobSubmissionClient`](crate::submit::JobSubmissionClient),
//! [`JobPoller`](crate::poll::JobPoller)); a backend only fails for
//! network-layer reasons.
//!
//! ```text
//! submit / poll ──► HttpRequest ──► Backend::send() ──► HttpResponse
//!                                         │
//!                              ┌──────────┴──────────┐
//!                         HttpBackend            MockBackend
//!                          (reqwest)          (scripted replies)
//! ```

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::{MockBackend, MockReply};

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// HTTP method used by the job API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A normalized outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Upper bound for this single request, on top of any client-wide timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![("Accept", "application/json".to_string())],
            body: Vec::new(),
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![
                ("Content-Type", content_type.into()),
                ("Accept", "application/json".to_string()),
            ],
            body,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed exchange, whatever the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Network-layer failure: no HTTP response was obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

/// Abstraction over the HTTP stack.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one request. Exactly one network exchange per call, no retry.
    async fn send(&self, client: &Client, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request_headers() {
        let req = HttpRequest::get("http://h/jobs/1");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert!(req.header("Content-Type").is_none());
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_post_request_headers() {
        let req = HttpRequest::post("http://h/jobs", "multipart/form-data; boundary=x", vec![1])
            .with_timeout(Duration::from_secs(5));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("content-type"), Some("multipart/form-data; boundary=x"));
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(201, "").is_success());
        assert!(HttpResponse::new(299, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(300, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }
}
