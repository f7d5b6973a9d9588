use loragate_hardware::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that end a gateway run.
///
/// Per-line failures never surface here; they are counted in
/// [`GatewayStats`](crate::GatewayStats) and the loop moves on.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The serial transport could not be acquired.
    #[error("Failed to open serial transport after {attempts} attempt(s): {source}")]
    StartupFatal {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Lifecycle bookkeeping failed.
    #[error(transparent)]
    Lifecycle(#[from] loragate_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_fatal_display() {
        let err = GatewayError::StartupFatal {
            attempts: 3,
            source: TransportError::open_failed("/dev/ttyUSB0", "No such file or directory"),
        };
        let text = err.to_string();
        assert!(text.starts_with("Failed to open serial transport after 3 attempt(s)"));
        assert!(text.contains("/dev/ttyUSB0"));
    }
}
