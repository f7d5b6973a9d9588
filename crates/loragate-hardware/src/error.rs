//! Error types for transport and peripheral operations.
//!
//! Every variant except [`TransportError::OpenFailed`] describes a condition
//! the run loop recovers from by backing off and reading again.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by line transports and output pins.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device could not be opened.
    #[error("Failed to open {device}: {message}")]
    OpenFailed { device: String, message: String },

    /// The device went away (unplugged, stream closed).
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Read or write failure on an open device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn open_failed(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether reading again after a short pause may succeed.
    ///
    /// Open failures are only retryable through a fresh open; the caller
    /// decides how many attempts it allows.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::OpenFailed { .. })
    }
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::Io(kind) => Self::Io(std::io::Error::new(kind, err.description)),
            serialport::ErrorKind::NoDevice => Self::Disconnected {
                device: err.description,
            },
            _ => Self::Other(err.description),
        }
    }
}
