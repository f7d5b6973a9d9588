//! Serial line transport for the radio receiver.
//!
//! The receiver is a USB serial adapter printing one line per received
//! packet. [`SerialTransport`] opens it 8N1 at the configured baud rate with a
//! short read timeout, runs the blocking reads on tokio's blocking pool and
//! frames bytes into lines with a [`LineFramer`].
//!
//! # Recovery
//!
//! A read timeout yields `Ok(None)`. Any other read failure drops the port
//! handle and returns the error; the next [`read_line`] reopens the device.
//! This covers the adapter being unplugged and plugged back in.
//!
//! ```no_run
//! use loragate_hardware::{LineTransport, SerialConfig, SerialTransport};
//!
//! # async fn example() -> loragate_hardware::Result<()> {
//! let mut serial = SerialTransport::open(&SerialConfig::default())?;
//!
//! while let Some(line) = serial.read_line().await? {
//!     println!("RX {line}");
//! }
//! serial.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`read_line`]: crate::LineTransport::read_line

use std::io::{ErrorKind, Read};
use std::time::Duration;

use loragate_protocol::LineFramer;
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::error::{Result, TransportError};
use crate::traits::LineTransport;

/// Bytes requested from the port per read.
const READ_CHUNK_SIZE: usize = 256;

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (e.g. `/dev/ttyUSB0`).
    pub port: String,

    pub baud_rate: u32,

    /// Upper bound for a single read.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(1000),
        }
    }
}

/// Line transport over a serial port.
pub struct SerialTransport {
    config: SerialConfig,

    /// `None` after a read failure or close; reopened on the next read.
    port: Option<Box<dyn SerialPort>>,

    framer: LineFramer,
}

impl SerialTransport {
    /// Open the serial device.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::OpenFailed`] if the device does not exist,
    /// is busy or rejects the settings.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = open_port(config)?;
        tracing::info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "Serial port opened"
        );

        Ok(Self {
            config: config.clone(),
            port: Some(port),
            framer: LineFramer::new(),
        })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Whether a port handle is currently held.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl LineTransport for SerialTransport {
    async fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.framer.next_line() {
            return Ok(Some(line));
        }

        // Opening a tty can block as long as a read, so both run off the
        // async workers.
        let held = self.port.take();
        let config = self.config.clone();
        let (port, reopened, read) = tokio::task::spawn_blocking(move || {
            let (mut port, reopened) = match held {
                Some(port) => (port, false),
                None => (open_port(&config)?, true),
            };
            let mut buf = [0u8; READ_CHUNK_SIZE];
            let read = port.read(&mut buf).map(|n| buf[..n].to_vec());
            Ok::<_, TransportError>((port, reopened, read))
        })
        .await
        .map_err(|e| TransportError::other(format!("Serial read task failed: {e}")))??;

        if reopened {
            self.framer.clear();
            tracing::info!(port = %self.config.port, "Serial port reopened");
        }

        match read {
            Ok(bytes) if bytes.is_empty() => {
                // Zero-length read on a tty means the device went away
                self.framer.clear();
                Err(TransportError::disconnected(&self.config.port))
            }
            Ok(bytes) => {
                self.port = Some(port);
                tracing::trace!(bytes = bytes.len(), "Serial read");
                self.framer.feed(&bytes);
                Ok(self.framer.next_line())
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                self.port = Some(port);
                Ok(None)
            }
            Err(e) => {
                self.framer.clear();
                Err(TransportError::Io(e))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            tracing::info!(port = %self.config.port, "Serial port closed");
        }
        self.framer.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.port
    }
}

fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    serialport::new(&config.port, config.baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|e| TransportError::open_failed(&config.port, e.description))
}
