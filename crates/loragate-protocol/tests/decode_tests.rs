//! Table-driven decoding tests over representative receiver output.

use loragate_core::Error;
use loragate_protocol::{Event, LineDecoder};
use rstest::rstest;

fn rfid(node: i64, seq: i64, uid: &str) -> Event {
    Event::new(node, seq, "rfid_scan", Some(uid.to_string()))
}

#[rstest]
#[case("node=12;seq=25;ev=occupied", Event::new(12, 25, "occupied", None))]
#[case("node=12;seq=26;ev=vacant RSSI=-97 SNR=-3.2", Event::new(12, 26, "vacant", None))]
#[case("node=12;seq=30;ev=rfid_scan;uid=ABCD1234 extra", rfid(12, 30, "ABCD1234"))]
#[case("  node=12;seq=30;ev=RFID_SCAN;uid=abcd1234\r\n", rfid(12, 30, "abcd1234"))]
#[case("node=1;seq=0;ev=heartbeat;bat=3.71", Event::new(1, 0, "heartbeat", None))]
#[case("node=-4;seq=+8;ev=occupied", Event::new(-4, 8, "occupied", None))]
#[case("node=9;seq=1;ev=rfid_scan", Event::new(9, 1, "rfid_scan", None))]
fn test_decodes_event(#[case] line: &str, #[case] expected: Event) {
    assert_eq!(LineDecoder::decode(line).unwrap(), Some(expected));
}

#[rstest]
#[case("")]
#[case("\r\n")]
#[case("RSSI=-80")]
#[case("+RCV=12,27,node=12;seq=1;ev=x,-40,11")]
#[case("NODE=12;seq=1;ev=occupied")]
#[case("boot: sx1276 init ok")]
fn test_ignores_foreign_line(#[case] line: &str) {
    assert_eq!(LineDecoder::decode(line).unwrap(), None);
}

#[rstest]
#[case("node=12", "seq")]
#[case("node=12;seq=4", "ev")]
#[case("node=12;ev=occupied", "seq")]
#[case("node=12;seq;ev=occupied", "seq")]
fn test_rejects_missing_field(#[case] line: &str, #[case] missing: &str) {
    match LineDecoder::decode(line) {
        Err(Error::MissingField { field }) => assert_eq!(field, missing),
        other => panic!("expected missing '{missing}', got {other:?}"),
    }
}

#[rstest]
#[case("node=abc;seq=1;ev=occupied", "node")]
#[case("node=0x0C;seq=1;ev=occupied", "node")]
#[case("node=12;seq=one;ev=occupied", "seq")]
#[case("node=12;seq=99999999999999999999;ev=occupied", "seq")]
fn test_rejects_non_numeric(#[case] line: &str, #[case] field_name: &str) {
    match LineDecoder::decode(line) {
        Err(Error::NonNumericField { field, .. }) => assert_eq!(field, field_name),
        other => panic!("expected non-numeric '{field_name}', got {other:?}"),
    }
}

#[test]
fn test_first_space_separates_telemetry() {
    // A space inside the token cuts it short: `ev` never makes it in
    let err = LineDecoder::decode("node=12;seq=1; ev=occupied").unwrap_err();
    assert!(err.is_malformed());
}
