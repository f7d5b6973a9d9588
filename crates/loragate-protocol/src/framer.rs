//! Byte-to-line framer for the serial link.
//!
//! The radio receiver prints one protocol line per received packet,
//! terminated by `\n` (usually `\r\n`). A serial read returns whatever bytes
//! arrived within the read timeout, so a single read may hold a partial
//! line, several lines, or nothing at all. [`LineFramer`] buffers bytes
//! across reads and yields complete lines.
//!
//! # Line Handling
//!
//! - Lines are split on `\n`; surrounding whitespace (including `\r`) is
//!   stripped from every line.
//! - Lines that are empty after stripping are skipped.
//! - Byte sequences that are not valid UTF-8 are dropped; the remaining
//!   text is kept.
//! - A line longer than [`MAX_LINE_LENGTH`] is discarded whole and the
//!   framer resynchronises at the next `\n`.
//!
//! # Usage
//!
//! ```
//! use loragate_protocol::LineFramer;
//!
//! let mut framer = LineFramer::new();
//!
//! framer.feed(b"node=12;seq=1;ev=occ");
//! assert!(framer.next_line().is_none());
//!
//! framer.feed(b"upied RSSI=-80\r\nnode=12;");
//! assert_eq!(
//!     framer.next_line().as_deref(),
//!     Some("node=12;seq=1;ev=occupied RSSI=-80")
//! );
//! assert!(framer.next_line().is_none());
//! ```

use bytes::BytesMut;
use loragate_core::constants::{LINE_TERMINATOR, MAX_LINE_LENGTH};
use std::collections::VecDeque;

/// Initial buffer capacity for incoming serial data.
const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Initial capacity for the queue of complete lines.
const INITIAL_LINE_QUEUE_CAPACITY: usize = 4;

/// Framer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Accumulating bytes of the current line.
    Reading,

    /// Skipping the remainder of an overlong line until the next `\n`.
    Discarding,
}

/// Stateful byte-to-line framer.
///
/// ```text
/// ┌─────────┐  buffer > MAX_LINE_LENGTH  ┌────────────┐
/// │ Reading │───────────────────────────>│ Discarding │
/// └─────────┘                            └────────────┘
///      ^                                       │
///      └───────────────── '\n' ────────────────┘
/// ```
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes of the line currently being assembled.
    buffer: BytesMut,

    state: FramerState,

    /// Complete lines ready for extraction.
    lines: VecDeque<String>,

    /// Number of overlong lines discarded since creation.
    discarded: u64,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: FramerState::Reading,
            lines: VecDeque::with_capacity(INITIAL_LINE_QUEUE_CAPACITY),
            discarded: 0,
        }
    }

    /// Feed bytes read from the link.
    ///
    /// Every complete line contained in `bytes` (together with any buffered
    /// partial line) is queued; a trailing partial line stays buffered.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
            let line = self.buffer.split_to(pos);
            let _ = self.buffer.split_to(1); // Consume '\n'

            match self.state {
                FramerState::Reading if line.len() > MAX_LINE_LENGTH => {
                    self.record_overlong(line.len());
                }
                FramerState::Reading => self.enqueue(&line),
                FramerState::Discarding => self.state = FramerState::Reading,
            }
        }

        if self.buffer.len() > MAX_LINE_LENGTH {
            self.discard_overlong();
        }
    }

    /// Next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Number of complete lines ready for extraction.
    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Bytes of the current partial line held in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Number of overlong lines dropped so far.
    pub fn discarded_lines(&self) -> u64 {
        self.discarded
    }

    /// Queue the buffered partial line as if its terminator had arrived.
    ///
    /// Used at end of stream, where the last line may be unterminated.
    ///
    /// ```
    /// use loragate_protocol::LineFramer;
    ///
    /// let mut framer = LineFramer::new();
    /// framer.feed(b"node=1;seq=2;ev=occupied");
    /// framer.flush();
    /// assert_eq!(framer.next_line().as_deref(), Some("node=1;seq=2;ev=occupied"));
    /// ```
    pub fn flush(&mut self) {
        if self.state == FramerState::Reading && !self.buffer.is_empty() {
            let line = self.buffer.split();
            self.enqueue(&line);
        }
        self.buffer.clear();
        self.state = FramerState::Reading;
    }

    /// Drop buffered bytes and queued lines.
    ///
    /// Called when the underlying link is reopened: bytes from the previous
    /// session cannot be joined with new ones.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.state = FramerState::Reading;
    }

    /// Iterator draining all queued lines.
    ///
    /// It does not parse more data; call [`feed()`] first.
    ///
    /// ```
    /// use loragate_protocol::LineFramer;
    ///
    /// let mut framer = LineFramer::new();
    /// framer.feed(b"a\nb\n\nc\n");
    ///
    /// let lines: Vec<_> = framer.drain_lines().collect();
    /// assert_eq!(lines, vec!["a", "b", "c"]);
    /// assert_eq!(framer.lines_available(), 0);
    /// ```
    ///
    /// [`feed()`]: LineFramer::feed
    pub fn drain_lines(&mut self) -> DrainLines<'_> {
        DrainLines { framer: self }
    }

    fn enqueue(&mut self, raw: &[u8]) {
        let text = decode_lossy(raw);
        let line = text.trim();
        if !line.is_empty() {
            self.lines.push_back(line.to_string());
        }
    }

    fn discard_overlong(&mut self) {
        if self.state == FramerState::Reading {
            self.record_overlong(self.buffer.len());
            self.state = FramerState::Discarding;
        }
        self.buffer.clear();
    }

    fn record_overlong(&mut self, bytes: usize) {
        tracing::warn!(bytes, max = MAX_LINE_LENGTH, "Discarding overlong line");
        self.discarded += 1;
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences.
fn decode_lossy(raw: &[u8]) -> String {
    let mut text = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Iterator returned by [`LineFramer::drain_lines`].
pub struct DrainLines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for DrainLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.framer.lines_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainLines<'_> {
    fn len(&self) -> usize {
        self.framer.lines_available()
    }
}
