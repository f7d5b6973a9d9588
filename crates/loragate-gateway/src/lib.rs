//! LoRa to HTTP backend gateway.
//!
//! Reads newline-delimited radio traffic from a serial receiver, decodes
//! `node=<id>;seq=<n>;ev=<type>[;uid=<hex>]` lines, attaches the sending
//! node's device key and posts each event to the backend.
//!
//! # Components
//!
//! - **GatewayConfig**: TOML configuration file
//! - **DeviceKeyTable**: node id to device key mapping
//! - **Gateway**: the run loop
//! - **Lifecycle**: STARTING / RUNNING / STOPPING state tracking

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod state_machine;

pub use auth::DeviceKeyTable;
pub use config::{BackendSection, ConfigError, DeviceEntry, GatewayConfig, SerialSection};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayStats, LineOutcome, RunLoopConfig};
pub use state_machine::{GatewayState, Lifecycle, StateTransition};
