//! HTTP forwarder for decoded events.
//!
//! The forwarder posts one [`OutboundRequest`] per call to the configured
//! backend endpoint:
//!
//! ```text
//! POST <backend_url>
//! Content-Type: application/json
//! X-Device-Key: <device key>
//!
//! {"node_id": 12, "seq": 30, "event_type": "rfid_scan", "rfid_uid": "ABCD1234"}
//! ```
//!
//! # Design Principles
//!
//! The forwarder is a thin transport layer:
//! - **No automatic retry**: delivery is at-most-once per event
//! - **Status is advisory**: any HTTP response, 2xx or not, is a [`ForwardReport`]
//! - **Bounded**: every request is limited by the configured timeout
//!
//! Transport failures (refused connection, DNS, timeout) are returned as
//! [`ForwardError`] for the caller to log and move on.
//!
//! # Example
//!
//! ```no_run
//! use loragate_core::DeviceKey;
//! use loragate_network::{ForwarderConfig, HttpForwarder, OutboundRequest};
//! use loragate_protocol::Event;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let forwarder = HttpForwarder::new(ForwarderConfig {
//!     backend_url: "http://192.168.1.52:8000/api/core/iot/events".to_string(),
//!     timeout: Duration::from_secs(5),
//! })?;
//!
//! let event = Event::new(12, 25, "occupied", None);
//! let request = OutboundRequest::new(&event, DeviceKey::new("e037ba73")?);
//!
//! let report = forwarder.forward(&request).await?;
//! println!("{} {}", report.status, report.body);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use loragate_core::constants::{DEFAULT_HTTP_TIMEOUT, HEADER_DEVICE_KEY};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, trace};

use crate::payload::OutboundRequest;

/// Default backend endpoint.
pub const DEFAULT_BACKEND_URL: &str = "http://192.168.1.52:8000/api/core/iot/events";

/// Configuration for the HTTP forwarder
///
/// # Example
///
/// ```
/// use loragate_network::ForwarderConfig;
/// use std::time::Duration;
///
/// let config = ForwarderConfig {
///     backend_url: "http://127.0.0.1:8000/api/core/iot/events".to_string(),
///     timeout: Duration::from_millis(2000),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Endpoint receiving the events
    pub backend_url: String,

    /// Upper bound for one request, connect to last body byte
    pub timeout: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT),
        }
    }
}

/// Errors that can occur while forwarding
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Backend URL could not be parsed or is not http(s)
    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Request did not complete within the timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend could not be reached
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other transport-level failure
    #[error("Request failed: {0}")]
    Request(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ForwardError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ForwardError::Timeout(timeout.as_millis() as u64)
        } else if err.is_connect() {
            ForwardError::Connect(error_chain(&err))
        } else {
            ForwardError::Request(error_chain(&err))
        }
    }
}

/// Render an error with its sources, `reqwest` keeps the useful part there.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Response body as received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// JSON when the text parses as JSON, text otherwise.
    pub fn classify(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ResponseBody::Json(_))
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => write!(f, "{value}"),
            ResponseBody::Text(text) => f.write_str(text),
        }
    }
}

/// Outcome of a request the backend answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardReport {
    pub status: u16,
    pub body: ResponseBody,
}

impl ForwardReport {
    /// Whether the backend answered 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP forwarder
///
/// Holds one pooled `reqwest` client for the whole process.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpForwarder {
    /// Create a forwarder.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::InvalidUrl`] if the backend URL does not parse
    /// or is not `http`/`https`, and [`ForwardError::Client`] if the HTTP
    /// client cannot be initialized.
    ///
    /// # Example
    ///
    /// ```
    /// use loragate_network::{ForwardError, ForwarderConfig, HttpForwarder};
    ///
    /// let bad = HttpForwarder::new(ForwarderConfig {
    ///     backend_url: "not a url".to_string(),
    ///     ..ForwarderConfig::default()
    /// });
    /// assert!(matches!(bad, Err(ForwardError::InvalidUrl { .. })));
    /// ```
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwardError> {
        let url = Url::parse(&config.backend_url).map_err(|e| ForwardError::InvalidUrl {
            url: config.backend_url.clone(),
            message: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ForwardError::InvalidUrl {
                url: config.backend_url,
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ForwardError::Client(error_chain(&e)))?;

        debug!(url = %url, timeout_ms = config.timeout.as_millis() as u64, "Forwarder ready");

        Ok(Self {
            client,
            url,
            timeout: config.timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request.
    ///
    /// Any HTTP response is `Ok`, including 4xx and 5xx. The body is read
    /// fully and classified as JSON or text.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Timeout`], [`ForwardError::Connect`] or
    /// [`ForwardError::Request`] when no response could be obtained.
    pub async fn forward(&self, request: &OutboundRequest) -> Result<ForwardReport, ForwardError> {
        trace!(
            node_id = request.payload.node_id,
            seq = request.payload.seq,
            url = %self.url,
            "Posting event"
        );

        let response = self
            .client
            .post(self.url.clone())
            .header(HEADER_DEVICE_KEY, request.device_key.expose())
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| ForwardError::from_reqwest(e, self.timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ForwardError::from_reqwest(e, self.timeout))?;

        Ok(ForwardReport {
            status,
            body: ResponseBody::classify(text),
        })
    }
}
