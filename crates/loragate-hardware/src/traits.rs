//! Device trait definitions.
//!
//! These traits are the contract between the gateway run loop and the
//! devices it talks to: the serial line coming from the radio receiver and
//! the output pin driving a buzzer. Real drivers and mocks implement the
//! same traits, so the run loop is tested against mocks.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;

/// Source of text lines from the radio receiver.
///
/// A transport owns its device handle exclusively. It is opened once before
/// the run loop starts and released exactly once through [`close`].
///
/// # Object Safety
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use it as a generic parameter.
///
/// # Examples
///
/// ```no_run
/// use loragate_hardware::traits::LineTransport;
/// use loragate_hardware::error::Result;
///
/// async fn next_line<T: LineTransport>(transport: &mut T) -> Result<String> {
///     loop {
///         if let Some(line) = transport.read_line().await? {
///             return Ok(line);
///         }
///     }
/// }
/// ```
///
/// [`close`]: LineTransport::close
pub trait LineTransport: Send {
    /// Read the next complete line.
    ///
    /// Waits at most one read timeout. Returns `Ok(None)` when no complete
    /// line arrived within it; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the device failed or went away. Such errors are
    /// [retryable](crate::TransportError::is_retryable): the next call may
    /// recover the device.
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Release the device handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the device reported a failure while closing.
    /// The handle is released either way.
    async fn close(&mut self) -> Result<()>;

    /// Human-readable device name (for logs).
    fn name(&self) -> &str;
}

/// Logic level of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    Low,
    High,
}

/// Digital output pin.
pub trait OutputPin: Send {
    /// Drive the pin to `level`.
    async fn set_level(&mut self, level: PinLevel) -> Result<()>;
}
