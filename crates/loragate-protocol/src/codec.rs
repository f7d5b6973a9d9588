//! Tokio codec for newline-delimited receiver output.
//!
//! `LineCodec` wraps the [`LineFramer`] so any `AsyncRead` byte source can
//! be turned into a stream of text lines with `FramedRead`:
//!
//! ```text
//! AsyncRead -> LineCodec (LineFramer) -> String
//! ```
//!
//! # Usage with Tokio FramedRead
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use loragate_protocol::{LineCodec, LineDecoder};
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example(reader: tokio::io::DuplexStream) -> loragate_core::Result<()> {
//! let mut lines = FramedRead::new(reader, LineCodec::new());
//!
//! while let Some(line) = lines.next().await {
//!     if let Some(event) = LineDecoder::decode(&line?)? {
//!         println!("{event}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Decoding never fails on content: invalid bytes are dropped and overlong
//! lines are discarded by the framer. Errors only come from the underlying
//! reader.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::LineFramer;
use loragate_core::{Error, Result};

/// Tokio decoder producing one trimmed, non-empty line per item.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use loragate_protocol::LineCodec;
///
/// let mut codec = LineCodec::new();
/// let mut buffer = BytesMut::from(&b"node=12;seq=1;ev=occupied\r\nnode="[..]);
///
/// let line = codec.decode(&mut buffer).unwrap();
/// assert_eq!(line.as_deref(), Some("node=12;seq=1;ev=occupied"));
/// assert_eq!(codec.decode(&mut buffer).unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct LineCodec {
    framer: LineFramer,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the inner framer (buffer state, discard counter).
    pub fn framer(&self) -> &LineFramer {
        &self.framer
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // All bytes now belong to the framer's buffer
            self.framer.feed(src);
            src.clear();
        }

        Ok(self.framer.next_line())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.framer.flush();
        Ok(self.framer.next_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::from(&b"node=12;seq=25;ev=occupied\n"[..]);

        let line = codec.decode(&mut buffer).unwrap();
        assert_eq!(line.as_deref(), Some("node=12;seq=25;ev=occupied"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut codec = LineCodec::new();

        let mut buffer = BytesMut::from(&b"node=12;seq="[..]);
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert_eq!(codec.framer().buffered_len(), 12);

        buffer.extend_from_slice(b"25;ev=occupied\r\n");
        let line = codec.decode(&mut buffer).unwrap();
        assert_eq!(line.as_deref(), Some("node=12;seq=25;ev=occupied"));
    }

    #[test]
    fn test_decode_queues_multiple_lines() {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::from(&b"a\nb\n"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("a"));
        // Second line is served from the queue with an empty source
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("b"));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_decode_eof_flushes_trailing_line() {
        let mut codec = LineCodec::new();
        let mut buffer = BytesMut::from(&b"first\nlast"[..]);

        assert_eq!(codec.decode_eof(&mut buffer).unwrap().as_deref(), Some("first"));
        assert_eq!(codec.decode_eof(&mut buffer).unwrap().as_deref(), Some("last"));
        assert_eq!(codec.decode_eof(&mut buffer).unwrap(), None);
    }

    #[tokio::test]
    async fn test_framed_read_over_duplex() {
        use futures::StreamExt;
        use tokio::io::AsyncWriteExt;
        use tokio_util::codec::FramedRead;

        let (mut writer, reader) = tokio::io::duplex(64);
        let lines = FramedRead::new(reader, LineCodec::new());

        writer.write_all(b"node=1;seq=1;ev=a\r\n\r\nnode=1;").await.unwrap();
        writer.write_all(b"seq=2;ev=b").await.unwrap();
        drop(writer);

        let collected: Vec<String> = lines
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec!["node=1;seq=1;ev=a", "node=1;seq=2;ev=b"]);
    }
}
