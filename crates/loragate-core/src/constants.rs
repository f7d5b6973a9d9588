//! Core constants for the LoRa gateway line protocol.
//!
//! This module defines the protocol-level constants shared by the decoder,
//! the transport layer and the HTTP forwarder, plus the default timing values
//! used when the configuration file leaves them out.
//!
//! # Protocol Structure
//!
//! The radio receiver prints one event per line on its serial port:
//!
//! ```text
//! node=12;seq=30;ev=rfid_scan;uid=ABCD1234 RSSI=-80 SNR=9.5
//! ```
//!
//! Where:
//! - `node=` - Mandatory prefix, identifies protocol traffic
//! - `;` - Separates `key=value` fields
//! - `=` - Separates a key from its value (first occurrence only)
//! - ` ` - Everything after the first space is telemetry and is ignored
//!
//! # Usage
//!
//! ```
//! use loragate_core::constants::*;
//!
//! let line = "node=12;seq=25;ev=occupied";
//! assert!(line.starts_with(PROTOCOL_PREFIX));
//!
//! let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
//! assert_eq!(fields.len(), 3);
//! ```

// ============================================================================
// Protocol Delimiters
// ============================================================================

/// Prefix every protocol line starts with.
///
/// Lines whose first token does not start with this prefix are foreign
/// traffic (boot banners, debug prints, telemetry) and are ignored.
///
/// # Examples
///
/// ```
/// use loragate_core::constants::PROTOCOL_PREFIX;
///
/// assert!("node=12;seq=1;ev=occupied".starts_with(PROTOCOL_PREFIX));
/// assert!(!"RSSI=-80".starts_with(PROTOCOL_PREFIX));
/// ```
pub const PROTOCOL_PREFIX: &str = "node=";

/// Field separator inside the protocol token.
pub const FIELD_DELIMITER: char = ';';

/// Key/value separator inside a field. Only the first occurrence splits.
///
/// # Examples
///
/// ```
/// use loragate_core::constants::KEY_VALUE_SEPARATOR;
///
/// let (key, value) = "uid=AB=CD".split_once(KEY_VALUE_SEPARATOR).unwrap();
/// assert_eq!(key, "uid");
/// assert_eq!(value, "AB=CD");
/// ```
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Separator between the protocol token and trailing telemetry.
pub const TELEMETRY_SEPARATOR: char = ' ';

// ============================================================================
// Field Names
// ============================================================================

/// Node identifier field (required, integer).
pub const FIELD_NODE: &str = "node";

/// Sequence number field (required, integer).
pub const FIELD_SEQ: &str = "seq";

/// Event type field (required, lowercased on decode).
pub const FIELD_EVENT: &str = "ev";

/// RFID card UID field (optional, only kept on `rfid_scan` events).
pub const FIELD_UID: &str = "uid";

/// Event type that carries an RFID card UID.
pub const EVENT_RFID_SCAN: &str = "rfid_scan";

// ============================================================================
// Backend Contract
// ============================================================================

/// Header carrying the per-device pre-shared secret.
pub const HEADER_DEVICE_KEY: &str = "X-Device-Key";

/// Content type of every outbound request.
pub const CONTENT_TYPE_JSON: &str = "application/json";

// ============================================================================
// Line Framing
// ============================================================================

/// Line terminator byte.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Maximum length of a single line before it is discarded (bytes).
///
/// A receiver that stops printing newlines (baud mismatch, noise) would
/// otherwise grow the framing buffer without bound. Protocol lines are well
/// under 100 bytes; the limit leaves generous room for telemetry suffixes.
///
/// # Value: 4096 bytes
pub const MAX_LINE_LENGTH: usize = 4 * 1024;

// ============================================================================
// Timing Defaults
// ============================================================================

/// Default serial baud rate of the radio receiver.
///
/// # Value: 115200
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default serial read timeout (milliseconds).
///
/// Bounds every read so the run loop can notice a shutdown request.
///
/// # Value: 1000ms
///
/// ```
/// use loragate_core::constants::DEFAULT_SERIAL_READ_TIMEOUT;
/// use std::time::Duration;
///
/// let timeout = Duration::from_millis(DEFAULT_SERIAL_READ_TIMEOUT);
/// assert_eq!(timeout.as_secs(), 1);
/// ```
pub const DEFAULT_SERIAL_READ_TIMEOUT: u64 = 1000;

/// Default pause after a failed serial read (milliseconds).
///
/// # Value: 1000ms
pub const DEFAULT_READ_ERROR_BACKOFF: u64 = 1000;

/// Default number of attempts to open the serial device at startup.
///
/// # Value: 1 (a missing device is fatal immediately)
pub const DEFAULT_OPEN_ATTEMPTS: u32 = 1;

/// Default pause between serial open attempts (milliseconds).
///
/// # Value: 1000ms
pub const DEFAULT_OPEN_RETRY_DELAY: u64 = 1000;

/// Default backend request timeout (milliseconds).
///
/// # Value: 5000ms
pub const DEFAULT_HTTP_TIMEOUT: u64 = 5000;

/// Default pause after a backend transport failure (milliseconds).
///
/// Prevents a tight failure loop while the backend is down.
///
/// # Value: 1000ms
pub const DEFAULT_BACKEND_FAILURE_BACKOFF: u64 = 1000;
