//! Mock HTTP backend for testing.
//!
//! [`MockBackend`] serves an `axum` router on a local port. Every request,
//! whatever its path, is recorded and answered with the next scripted
//! [`MockResponse`], or with the fallback once the script runs out.
//!
//! Available with the `mock` feature.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use loragate_core::constants::CONTENT_TYPE_JSON;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Path the backend exposes events on.
const EVENTS_PATH: &str = "/api/core/iot/events";

/// Scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,

    /// Wait before replying (to trigger client timeouts).
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON.to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Request as received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,

    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,

    pub body: Bytes,
}

impl RecordedRequest {
    /// First header with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug)]
struct Shared {
    requests: Mutex<Vec<RecordedRequest>>,
    scripted: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    count_tx: watch::Sender<usize>,
}

impl Shared {
    fn requests(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn scripted(&self) -> MutexGuard<'_, VecDeque<MockResponse>> {
        self.scripted.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, request: RecordedRequest) -> MockResponse {
        let count = {
            let mut requests = self.requests();
            requests.push(request);
            requests.len()
        };
        self.count_tx.send_replace(count);

        self.scripted()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

async fn handle_request(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> MockResponse {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let response = shared.record(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers,
        body,
    });

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }
    response
}

/// Local HTTP server standing in for the backend.
///
/// The server task stops when the `MockBackend` is dropped.
#[derive(Debug)]
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
    count_rx: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// `fallback` answers every request once the scripted replies run out.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn start(fallback: MockResponse) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (count_tx, count_rx) = watch::channel(0);

        let shared = Arc::new(Shared {
            requests: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            fallback,
            count_tx,
        });

        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&shared));

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::debug!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            shared,
            count_rx,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Events endpoint URL of this server.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, EVENTS_PATH)
    }

    /// Queue a reply for the next request not yet answered.
    pub fn enqueue(&self, response: MockResponse) {
        self.shared.scripted().push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests().clone()
    }

    pub fn request_count(&self) -> usize {
        *self.count_rx.borrow()
    }

    /// Wait until at least `count` requests arrived.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let mut rx = self.count_rx.clone();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|n| *n >= count)).await,
            Ok(Ok(_))
        )
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_status_mapping() {
        let response = MockResponse::text(503, "busy").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );

        let invalid = MockResponse::json(42, "{}").into_response();
        assert_eq!(invalid.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_recorded_header_lookup() {
        let request = RecordedRequest {
            method: "POST".to_string(),
            path: EVENTS_PATH.to_string(),
            headers: vec![("x-device-key".to_string(), "k".to_string())],
            body: Bytes::from_static(br#"{"seq":1}"#),
        };

        assert_eq!(request.header("X-Device-Key"), Some("k"));
        assert_eq!(request.header("content-type"), None);
        assert_eq!(request.json().unwrap()["seq"], 1);
    }
}
