//! Mock backend for testing without a live job server.
//!
//! [`MockBackend`] returns scripted replies in order and records every request
//! it receives, so tests can assert both on outcomes and on what went over
//! the wire (or that nothing did).
//!
//! # Example
//!
//! ```
//! use recipe_jobs::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new(vec![
//!     MockReply::json(201, r#"{"job_id":"j1","status":"pending"}"#),
//!     MockReply::json(200, r#"{"job_id":"j1","status":"done"}"#),
//! ]);
//! assert_eq!(mock.request_count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, HttpRequest, HttpResponse, TransportError};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this status and body after `delay`.
    Respond {
        status: u16,
        body: String,
        delay: Duration,
    },
    /// Fail at the network layer.
    Fail(TransportError),
}

impl MockReply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        MockReply::Respond {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Delay the reply; honors the request's own timeout.
    pub fn delayed(self, by: Duration) -> Self {
        match self {
            MockReply::Respond { status, body, .. } => MockReply::Respond {
                status,
                body,
                delay: by,
            },
            fail => fail,
        }
    }

    pub fn connection_reset() -> Self {
        MockReply::Fail(TransportError::Other {
            url: "mock".into(),
            message: "connection reset by peer".into(),
        })
    }
}

/// A test backend that returns scripted replies in order.
///
/// Once the script is exhausted the last reply repeats, which makes
/// "server is stuck on pending" scenarios a one-liner.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockBackend {
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always gives the same reply.
    pub fn fixed(reply: MockReply) -> Self {
        Self::new(vec![reply])
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed);
        self.replies[idx.min(self.replies.len() - 1)].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn send(&self, _client: &Client, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        match self.next_reply() {
            MockReply::Fail(err) => Err(err),
            MockReply::Respond {
                status,
                body,
                delay,
            } => {
                let respond = async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    HttpResponse { status, body }
                };
                match request.timeout {
                    Some(limit) => tokio::time::timeout(limit, respond).await.map_err(|_| {
                        TransportError::Timeout {
                            url: request.url.clone(),
                        }
                    }),
                    None => Ok(respond.await),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
