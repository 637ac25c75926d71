//! Order relay forwarding adapter.
//!
//! Implements [`relay::OrderForwarder`] as a single HTTP POST of
//! `{"ID": "<order id>"}` to the configured processing endpoint.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP client construction, request encoding, and status
//! mapping live here. The [`relay`] crate sees only [`relay::OrderForwarder`].
//!
//! ## Delivery policy
//!
//! Best-effort. One attempt per order, no retry, no backoff. The response body
//! is never read; a non-success status is reported as
//! [`relay::ForwardError::Status`] purely so the caller can log it. A client
//! timeout bounds each attempt; it does not block the receive loop, which
//! handles every message in its own task.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

use relay::{ForwardError, ForwardRequest, OrderForwarder};

/// The forwarder could not be constructed.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The processing endpoint is not a valid absolute URL.
    #[error("Invalid processing endpoint '{url}': {message}")]
    InvalidEndpoint {
        /// The configured endpoint.
        url: String,
        /// Parser description.
        message: String,
    },

    /// The HTTP client could not be built (e.g. TLS backend initialisation).
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// POSTs forward requests to one processing endpoint.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    endpoint: Url,
}

impl HttpForwarder {
    /// Creates a forwarder for `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, WebhookError> {
        let endpoint = Url::parse(endpoint).map_err(|e| WebhookError::InvalidEndpoint {
            url: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eventlistener/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// The processing endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl OrderForwarder for HttpForwarder {
    async fn forward(&self, request: &ForwardRequest) -> Result<(), ForwardError> {
        let body =
            serde_json::to_vec(request).map_err(|e| ForwardError::Request(e.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), endpoint = %self.endpoint, "Processing endpoint responded");
        if status.is_success() {
            Ok(())
        } else {
            Err(ForwardError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::OrderId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Accepts one connection, captures the raw request, and answers with
    /// `status_line`.
    async fn capture_one(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/process", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });

        (url, rx)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn request(id: &str) -> ForwardRequest {
        ForwardRequest::new(OrderId::new(id))
    }

    #[tokio::test]
    async fn test_posts_json_body_with_content_type() {
        let (url, captured) = capture_one("HTTP/1.1 200 OK").await;
        let forwarder = HttpForwarder::new(&url, Duration::from_secs(5)).unwrap();

        forwarder
            .forward(&request("ORDER-0001-ABCDEF-1234XX"))
            .await
            .unwrap();

        let raw = captured.await.unwrap();
        assert!(raw.starts_with("POST /process HTTP/1.1"));
        assert!(raw
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        assert!(raw.ends_with(r#"{"ID":"ORDER-0001-ABCDEF-1234XX"}"#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let (url, _captured) = capture_one("HTTP/1.1 500 Internal Server Error").await;
        let forwarder = HttpForwarder::new(&url, Duration::from_secs(5)).unwrap();

        let err = forwarder.forward(&request("ORDER-1")).await.unwrap_err();

        assert!(matches!(err, ForwardError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/process", listener.local_addr().unwrap());
        drop(listener);

        let forwarder = HttpForwarder::new(&url, Duration::from_secs(5)).unwrap();
        let err = forwarder.forward(&request("ORDER-1")).await.unwrap_err();

        assert!(matches!(err, ForwardError::Transport(_)));
    }

    #[tokio::test]
    async fn test_hung_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/process", listener.local_addr().unwrap());
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let forwarder = HttpForwarder::new(&url, Duration::from_millis(200)).unwrap();
        let err = forwarder.forward(&request("ORDER-1")).await.unwrap_err();

        assert!(matches!(err, ForwardError::Transport(_)));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = HttpForwarder::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidEndpoint { .. }));
    }
}
