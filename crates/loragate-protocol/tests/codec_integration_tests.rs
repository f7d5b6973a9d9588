//! Integration tests for LineCodec with Tokio streams.
//!
//! These tests push receiver output through a duplex pipe in awkward chunks
//! and check that framing plus decoding yields the expected events.

use futures::StreamExt;
use loragate_protocol::{Event, LineCodec, LineDecoder};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::codec::FramedRead;

/// Helper function to create a framed reader and its raw writer.
fn create_framed_duplex(buffer_size: usize) -> (DuplexStream, FramedRead<DuplexStream, LineCodec>) {
    let (writer, reader) = tokio::io::duplex(buffer_size);
    (writer, FramedRead::new(reader, LineCodec::new()))
}

#[tokio::test]
async fn test_codec_single_event() {
    let (mut writer, mut lines) = create_framed_duplex(1024);

    writer
        .write_all(b"node=12;seq=30;ev=rfid_scan;uid=ABCD1234 RSSI=-80\r\n")
        .await
        .unwrap();

    let line = lines.next().await.unwrap().unwrap();
    let event = LineDecoder::decode(&line).unwrap().unwrap();

    assert_eq!(
        event,
        Event::new(12, 30, "rfid_scan", Some("ABCD1234".to_string()))
    );
}

#[tokio::test]
async fn test_codec_byte_at_a_time() {
    let (mut writer, mut lines) = create_framed_duplex(1024);
    let input = b"node=12;seq=25;ev=occupied\r\n";

    for byte in input {
        writer.write_all(&[*byte]).await.unwrap();
    }

    let line = lines.next().await.unwrap().unwrap();
    assert_eq!(line, "node=12;seq=25;ev=occupied");
}

#[tokio::test]
async fn test_codec_mixed_traffic_in_order() {
    let (mut writer, lines) = create_framed_duplex(1024);

    writer
        .write_all(
            b"LoRa RX ready\r\n\
              node=12;seq=1;ev=occupied\r\n\
              \r\n\
              node=12;ev=broken\r\n\
              node=7;seq=2;ev=rfid_scan;uid=0A0B\r\n",
        )
        .await
        .unwrap();
    drop(writer);

    let outcomes: Vec<_> = lines
        .map(|line| LineDecoder::decode(&line.unwrap()).map_err(|e| e.is_malformed()))
        .collect()
        .await;

    assert_eq!(
        outcomes,
        vec![
            Ok(None),
            Ok(Some(Event::new(12, 1, "occupied", None))),
            Err(true),
            Ok(Some(Event::new(7, 2, "rfid_scan", Some("0A0B".to_string())))),
        ]
    );
}

#[tokio::test]
async fn test_codec_small_pipe_buffer() {
    // Pipe smaller than a single line forces many partial reads
    let (mut writer, lines) = create_framed_duplex(8);

    let producer = tokio::spawn(async move {
        for seq in 0..20 {
            let line = format!("node=3;seq={seq};ev=occupied\n");
            writer.write_all(line.as_bytes()).await.unwrap();
        }
    });

    let seqs: Vec<i64> = lines
        .map(|line| {
            LineDecoder::decode(&line.unwrap())
                .unwrap()
                .unwrap()
                .seq()
        })
        .collect()
        .await;

    producer.await.unwrap();
    assert_eq!(seqs, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_codec_invalid_bytes_do_not_break_stream() {
    let (mut writer, mut lines) = create_framed_duplex(1024);

    writer.write_all(b"\xff\xfe\x00garbage\xc3\n").await.unwrap();
    writer.write_all(b"node=1;seq=1;ev=ok\n").await.unwrap();

    let first = lines.next().await.unwrap().unwrap();
    assert!(LineDecoder::decode(&first).unwrap().is_none());

    let second = lines.next().await.unwrap().unwrap();
    assert_eq!(second, "node=1;seq=1;ev=ok");
}

#[tokio::test]
async fn test_codec_trailing_line_at_eof() {
    let (mut writer, mut lines) = create_framed_duplex(1024);

    writer.write_all(b"node=5;seq=9;ev=vacant").await.unwrap();
    drop(writer);

    let line = lines.next().await.unwrap().unwrap();
    assert_eq!(line, "node=5;seq=9;ev=vacant");
    assert!(lines.next().await.is_none());
}
