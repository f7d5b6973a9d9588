//! Backend communication layer for the LoRa gateway
//!
//! This crate turns decoded events into HTTP requests and posts them to the
//! backend.
//!
//! # Components
//!
//! - **OutboundPayload / OutboundRequest**: JSON body plus device key
//! - **HttpForwarder**: `reqwest` client with a bounded timeout
//! - **mock::MockBackend**: local HTTP server for tests (`mock` feature)
//!
//! # Example
//!
//! ```no_run
//! use loragate_core::DeviceKey;
//! use loragate_network::{ForwarderConfig, HttpForwarder, OutboundRequest};
//! use loragate_protocol::LineDecoder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let forwarder = HttpForwarder::new(ForwarderConfig::default())?;
//!
//! if let Some(event) = LineDecoder::decode("node=12;seq=25;ev=occupied")? {
//!     let request = OutboundRequest::new(&event, DeviceKey::new("e037ba73")?);
//!     let report = forwarder.forward(&request).await?;
//!     println!("status {}", report.status);
//! }
//! # Ok(())
//! # }
//! ```

mod forwarder;
#[cfg(feature = "mock")]
pub mod mock;
mod payload;

pub use forwarder::{
    DEFAULT_BACKEND_URL, ForwardError, ForwardReport, ForwarderConfig, HttpForwarder,
    ResponseBody,
};
pub use payload::{OutboundPayload, OutboundRequest, build_payload};
