use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Malformed line: missing required field '{field}'")]
    MissingField { field: String },

    #[error("Malformed line: field '{field}' is not an integer: '{value}'")]
    NonNumericField { field: String, value: String },

    // Authentication errors
    #[error("No device key configured for node {node_id}")]
    UnauthenticatedDevice { node_id: i64 },

    #[error("Invalid device key: {0}")]
    InvalidDeviceKey(String),

    // Lifecycle errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn non_numeric(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NonNumericField {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns `true` for errors that mean a protocol line was rejected.
    ///
    /// Malformed lines are a data-quality event: the gateway drops the line
    /// and moves on without backing off.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::MissingField { .. } | Error::NonNumericField { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        assert!(Error::missing_field("seq").is_malformed());
        assert!(Error::non_numeric("node", "x").is_malformed());
        assert!(!Error::UnauthenticatedDevice { node_id: 99 }.is_malformed());
        assert!(!Error::Config("bad".to_string()).is_malformed());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::missing_field("seq").to_string(),
            "Malformed line: missing required field 'seq'"
        );
        assert_eq!(
            Error::non_numeric("node", "x").to_string(),
            "Malformed line: field 'node' is not an integer: 'x'"
        );
        assert_eq!(
            Error::UnauthenticatedDevice { node_id: 99 }.to_string(),
            "No device key configured for node 99"
        );
    }
}
