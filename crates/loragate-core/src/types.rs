use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Pre-shared secret authenticating a node towards the backend.
///
/// # Security
/// The key never appears in `Debug` output and is compared in constant time,
/// so it can travel through log statements and lookups without leaking.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Create a new device key.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceKey` if the key is empty or contains
    /// characters that cannot be sent in an HTTP header.
    pub fn new(key: &str) -> Result<Self> {
        let key = key.trim();

        if key.is_empty() {
            return Err(Error::InvalidDeviceKey("key must not be empty".to_string()));
        }

        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidDeviceKey(
                "key must be printable ASCII without spaces".to_string(),
            ));
        }

        Ok(DeviceKey(key.to_string()))
    }

    /// Get the secret as a string slice (for the request header).
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; empty keys are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DeviceKey(<{} bytes redacted>)", self.0.len())
    }
}

impl std::str::FromStr for DeviceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceKey::new(s)
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceKey::new(&value)
    }
}

impl From<DeviceKey> for String {
    fn from(key: DeviceKey) -> Self {
        key.0
    }
}

/// Constant-time comparison implementation for DeviceKey
impl PartialEq for DeviceKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}
