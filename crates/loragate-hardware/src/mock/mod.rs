//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod pin;
pub mod serial;

// Re-export commonly used types
pub use pin::MockPin;
pub use serial::{MockSerial, MockSerialHandle};
