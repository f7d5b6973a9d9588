//! Device layer for the LoRa gateway.
//!
//! This crate provides trait-based abstractions for the devices the gateway
//! talks to, a real serial implementation and mocks for tests.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Exclusive ownership**: A transport owns its device handle and releases
//!   it exactly once.
//! - **Recoverable failures**: Read errors are reported upward as retryable;
//!   only opening the device can fail for good.
//!
//! # Line Transports
//!
//! The [`LineTransport`] trait yields text lines from the radio receiver:
//!
//! ```no_run
//! use loragate_hardware::{LineTransport, Result};
//!
//! async fn pump<T: LineTransport>(transport: &mut T) -> Result<()> {
//!     loop {
//!         match transport.read_line().await {
//!             Ok(Some(line)) => println!("RX {line}"),
//!             Ok(None) => continue,
//!             Err(e) if e.is_retryable() => continue,
//!             Err(e) => return Err(e),
//!         }
//!     }
//! }
//! ```
//!
//! Implementations:
//! - [`SerialTransport`]: USB serial adapter via `serialport`
//! - [`MockSerial`](mock::MockSerial): in-memory pipe driven by a handle
//!
//! # Buzzer
//!
//! [`Buzzer`] plays [`BuzzerPattern`]s on an [`OutputPin`]. Only the mock
//! pin ships with this crate.

pub mod buzzer;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

// Re-export commonly used types for convenience
pub use buzzer::{Buzzer, BuzzerPattern, PinStep};
pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialTransport};
pub use traits::{LineTransport, OutputPin, PinLevel};
