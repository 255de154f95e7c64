//! Backend over a real [`reqwest::Client`].

use super::{Backend, HttpRequest, HttpResponse, Method, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Sends requests through `reqwest`. This is the default backend.
#[derive(Debug, Clone)]
pub struct HttpBackend;

impl HttpBackend {
    fn classify(url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            TransportError::Other {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(&self, client: &Client, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url).body(request.body.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(method = ?request.method, url = %request.url, bytes = request.body.len(), "sending request");
        let resp = builder
            .send()
            .await
            .map_err(|e| Self::classify(&request.url, e))?;

        let status = resp.status().as_u16();
        // A body that fails mid-read is still a transport failure, even after a status line.
        let body = resp
            .text()
            .await
            .map_err(|e| Self::classify(&request.url, e))?;
        debug!(url = %request.url, status, "received response");

        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = Client::new();
        let req = HttpRequest::get("http://127.0.0.1:1/jobs/x").with_timeout(Duration::from_secs(2));
        let err = HttpBackend.send(&client, &req).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect { .. } | TransportError::Timeout { .. } | TransportError::Other { .. }
        ));
    }

    #[test]
    fn test_name() {
        assert_eq!(HttpBackend.name(), "http");
    }
}
