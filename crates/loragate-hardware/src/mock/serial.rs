//! Mock serial link for testing and development.
//!
//! [`MockSerial`] reads from an in-memory pipe through the same
//! [`LineCodec`] framing a real receiver stream goes through. The paired
//! [`MockSerialHandle`] plays the radio receiver: it writes raw bytes or
//! whole lines, injects read failures and reports whether the transport
//! was released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::StreamExt;
use loragate_protocol::LineCodec;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;

use crate::error::{Result, TransportError};
use crate::traits::LineTransport;

/// Pipe capacity between handle and transport.
const PIPE_CAPACITY: usize = 4096;

/// Default read timeout, short enough to keep tests fast.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Mock serial transport.
///
/// # Examples
///
/// ```
/// use loragate_hardware::mock::MockSerial;
/// use loragate_hardware::traits::LineTransport;
///
/// #[tokio::main]
/// async fn main() -> loragate_hardware::Result<()> {
///     let (mut serial, handle) = MockSerial::new();
///
///     handle.send_line("node=12;seq=1;ev=occupied").await?;
///
///     let line = serial.read_line().await?;
///     assert_eq!(line.as_deref(), Some("node=12;seq=1;ev=occupied"));
///
///     serial.close().await?;
///     assert!(handle.is_released());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSerial {
    lines: FramedRead<DuplexStream, LineCodec>,

    name: String,

    read_timeout: Duration,

    /// Shared with the handle
    state: Arc<SharedState>,

    closed: bool,
}

#[derive(Debug, Default)]
struct SharedState {
    /// Reads left to fail before data flows again.
    pending_failures: AtomicUsize,

    /// Number of `close()` calls that released the device.
    releases: AtomicUsize,

    /// Number of `read_line()` calls.
    reads: AtomicUsize,
}

impl MockSerial {
    /// Create a mock serial link with the default name.
    ///
    /// Returns a tuple of (MockSerial, MockSerialHandle) where the handle
    /// feeds the link.
    pub fn new() -> (Self, MockSerialHandle) {
        Self::with_name("mock-serial".to_string())
    }

    /// Create a mock serial link with a custom name.
    pub fn with_name(name: String) -> (Self, MockSerialHandle) {
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let state = Arc::new(SharedState::default());

        let serial = Self {
            lines: FramedRead::new(reader, LineCodec::new()),
            name: name.clone(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: Arc::clone(&state),
            closed: false,
        };

        let handle = MockSerialHandle {
            writer: Arc::new(Mutex::new(Some(writer))),
            name,
            state,
        };

        (serial, handle)
    }

    /// Set how long `read_line` waits before reporting no line.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl LineTransport for MockSerial {
    async fn read_line(&mut self) -> Result<Option<String>> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);

        if self.closed {
            return Err(TransportError::disconnected(&self.name));
        }

        let injected = self
            .state
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TransportError::Io(std::io::Error::other(
                "injected read failure",
            )));
        }

        match tokio::time::timeout(self.read_timeout, self.lines.next()).await {
            Err(_elapsed) => Ok(None),
            Ok(None) => Err(TransportError::disconnected(&self.name)),
            Ok(Some(Ok(line))) => Ok(Some(line)),
            Ok(Some(Err(e))) => Err(TransportError::other(e.to_string())),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.state.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for driving a mock serial link.
///
/// Clones share the same link.
#[derive(Debug, Clone)]
pub struct MockSerialHandle {
    /// `None` once the receiver was unplugged
    writer: Arc<Mutex<Option<DuplexStream>>>,

    name: String,

    state: Arc<SharedState>,
}

impl MockSerialHandle {
    /// Write raw bytes onto the link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] after [`unplug`], or the
    /// pipe error if the transport was dropped.
    ///
    /// [`unplug`]: MockSerialHandle::unplug
    pub async fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| TransportError::disconnected(&self.name))?;

        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Write one line terminated by `\r\n`, as the receiver firmware does.
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        self.send_bytes(&bytes).await
    }

    /// Make the next `count` reads fail with an I/O error.
    pub fn inject_read_errors(&self, count: usize) {
        self.state.pending_failures.fetch_add(count, Ordering::SeqCst);
    }

    /// Close the writing side. Buffered lines are still delivered, then
    /// reads report the device as disconnected.
    pub async fn unplug(&self) {
        self.writer.lock().await.take();
    }

    /// Whether the transport has been closed.
    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    /// Number of times the transport released the device.
    pub fn release_count(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    /// Number of `read_line` calls made so far.
    pub fn read_count(&self) -> usize {
        self.state.reads.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
