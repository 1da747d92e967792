//! Cross-mode tests for the record layout.
//!
//! Every blob here is checked through all three access paths: a buffer
//! scan, a stream scan and the code index. They must agree byte for byte.

use std::io::Cursor;

use super::*;
use crate::Error;

/// Two records: `US` with payload `AA BB`, then `CA` with payload `CC`.
fn us_ca_blob() -> Vec<u8> {
    let mut writer = RecordWriter::new();
    writer.push("US", &[0xAA, 0xBB]).unwrap();
    writer.push("CA", &[0xCC]).unwrap();
    writer.finish()
}

/// Locate `code` through every access mode.
fn locate_all(data: &[u8], code: &str) -> [Option<Vec<u8>>; 3] {
    let buffer = match locate_in_buffer(data, code) {
        Ok(payload) => Some(payload.to_vec()),
        Err(Error::CodeNotFound(_)) => None,
        Err(e) => panic!("buffer scan failed: {}", e),
    };
    let stream = match locate_in_stream(&mut Cursor::new(data), code) {
        Ok(payload) => Some(payload),
        Err(Error::CodeNotFound(_)) => None,
        Err(e) => panic!("stream scan failed: {}", e),
    };
    let mut reader = IndexedReader::new(Cursor::new(data)).unwrap();
    let indexed = match reader.read_code(code) {
        Ok(payload) => Some(payload),
        Err(Error::CodeNotFound(_)) => None,
        Err(e) => panic!("indexed read failed: {}", e),
    };
    [buffer, stream, indexed]
}

fn assert_all_modes(data: &[u8], code: &str, expected: Option<&[u8]>) {
    let expected = expected.map(<[u8]>::to_vec);
    for (mode, found) in ["buffer", "stream", "index"].iter().zip(locate_all(data, code)) {
        assert_eq!(found, expected, "{} mode, code {:?}", mode, code);
    }
}

// ============================================================================
// Two-Record Blob
// ============================================================================

#[test]
fn test_locate_in_buffer_two_records() {
    let data = us_ca_blob();
    assert_eq!(locate_in_buffer(&data, "CA").unwrap(), &[0xCC]);
    assert_eq!(locate_in_buffer(&data, "US").unwrap(), &[0xAA, 0xBB]);
    assert!(matches!(
        locate_in_buffer(&data, "FR"),
        Err(Error::CodeNotFound(code)) if code == "FR"
    ));
}

#[test]
fn test_locate_in_stream_two_records() {
    let data = us_ca_blob();
    let mut cursor = Cursor::new(&data);
    assert_eq!(locate_in_stream(&mut cursor, "CA").unwrap(), vec![0xCC]);
    assert_eq!(locate_in_stream(&mut cursor, "US").unwrap(), vec![0xAA, 0xBB]);
    assert!(matches!(
        locate_in_stream(&mut cursor, "FR"),
        Err(Error::CodeNotFound(_))
    ));
}

#[test]
fn test_index_two_records() {
    let data = us_ca_blob();
    let index = build_index(&mut Cursor::new(&data)).unwrap();

    assert_eq!(index.len(), 2);
    let us = index.get("US").unwrap();
    let ca = index.get("CA").unwrap();
    assert_eq!((us.offset, us.size), (6, 2));
    assert_eq!((ca.offset, ca.size), (14, 1));
    assert!(index.get("FR").is_none());

    // Reading at the recorded offsets gives what a scan gives.
    let mut cursor = Cursor::new(&data);
    assert_eq!(index.read(&mut cursor, "US").unwrap(), locate_in_buffer(&data, "US").unwrap());
    assert_eq!(index.read(&mut cursor, "CA").unwrap(), locate_in_buffer(&data, "CA").unwrap());
    assert_eq!(index.slice(&data, "CA").unwrap(), &[0xCC]);
}

#[test]
fn test_code_prefix_is_not_a_match() {
    let data = us_ca_blob();
    assert_all_modes(&data, "C", None);
    assert_all_modes(&data, "CAX", None);
    assert_all_modes(&data, "us", None);
}

// ============================================================================
// Mode Agreement
// ============================================================================

#[test]
fn test_modes_agree_on_varied_records() {
    let long_code = "L".repeat(100);
    let big_payload: Vec<u8> = (0..=255u8).cycle().take(5000).collect();

    let mut writer = RecordWriter::new();
    writer.push("CN", &[1, 2, 3]).unwrap();
    writer.push("EMPTY", &[]).unwrap();
    writer.push(&long_code, &[9, 9]).unwrap();
    writer.push("BIG", &big_payload).unwrap();
    writer.push("X", &[0x42]).unwrap();
    let data = writer.finish();

    assert_all_modes(&data, "CN", Some(&[1, 2, 3]));
    assert_all_modes(&data, "EMPTY", Some(&[]));
    assert_all_modes(&data, &long_code, Some(&[9, 9]));
    assert_all_modes(&data, "BIG", Some(&big_payload));
    assert_all_modes(&data, "X", Some(&[0x42]));
    assert_all_modes(&data, "MISSING", None);
}

#[test]
fn test_code_crossing_lookahead_window() {
    // The code starts inside the window and ends well past it.
    let code = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    assert!(code.len() + 4 > LOOKAHEAD);

    let mut writer = RecordWriter::new();
    writer.push("AB", &[1]).unwrap();
    writer.push(code, &[2, 3]).unwrap();
    writer.push("ABCDEFGHIJKLMNOPQRSTUVWXYZ", &[4]).unwrap();
    let data = writer.finish();

    assert_all_modes(&data, code, Some(&[2, 3]));
    assert_all_modes(&data, "ABCDEFGHIJKLMNOPQRSTUVWXYZ", Some(&[4]));
}

#[test]
fn test_code_lists_agree() {
    let mut writer = RecordWriter::new();
    for code in ["JP", "KR", "TW", "HK"] {
        writer.push(code, code.as_bytes()).unwrap();
    }
    let data = writer.finish();

    let listed: Vec<&[u8]> = code_list(&data);
    assert_eq!(listed, vec![&b"JP"[..], b"KR", b"TW", b"HK"]);

    let index = build_index(&mut Cursor::new(&data)).unwrap();
    assert_eq!(index.codes().collect::<Vec<_>>(), vec!["JP", "KR", "TW", "HK"]);
    assert_eq!(
        CodeIndexTable::from_buffer(&data).iter().collect::<Vec<_>>(),
        index.iter().collect::<Vec<_>>()
    );
}

// ============================================================================
// Duplicate Codes
// ============================================================================

#[test]
fn test_duplicate_code_last_occurrence_wins() {
    let mut writer = RecordWriter::new();
    writer.push("DUP", &[1]).unwrap();
    writer.push("OTHER", &[2]).unwrap();
    writer.push("DUP", &[3, 3]).unwrap();
    let data = writer.finish();

    assert_all_modes(&data, "DUP", Some(&[3, 3]));

    // The index keeps first-occurrence order but the last location.
    let index = CodeIndexTable::from_buffer(&data);
    assert_eq!(index.codes().collect::<Vec<_>>(), vec!["DUP", "OTHER"]);
    assert_eq!(index.get("DUP").unwrap().size, 2);
}

// ============================================================================
// Corrupt and Truncated Data
// ============================================================================

#[test]
fn test_empty_blob() {
    assert_all_modes(&[], "US", None);
    assert!(build_index(&mut Cursor::new(Vec::<u8>::new())).unwrap().is_empty());
    assert!(code_list(&[]).is_empty());
}

#[test]
fn test_truncated_trailing_record_is_ignored() {
    let mut data = us_ca_blob();
    // Claims a 50 byte body but only 4 bytes follow.
    data.extend_from_slice(&[0x0A, 50, 0x0A, 0x02, b'F', b'R']);

    assert_all_modes(&data, "US", Some(&[0xAA, 0xBB]));
    assert_all_modes(&data, "CA", Some(&[0xCC]));
    assert_all_modes(&data, "FR", None);

    let mut records = Records::new(&data);
    assert_eq!(records.by_ref().count(), 2);
    assert!(records.stopped_early());
}

#[test]
fn test_malformed_trailing_varint_is_ignored() {
    let mut data = us_ca_blob();
    data.push(0x0A);
    data.extend_from_slice(&[0xFF; 11]);

    assert_all_modes(&data, "CA", Some(&[0xCC]));
    assert_eq!(build_index(&mut Cursor::new(&data)).unwrap().len(), 2);
}

#[test]
fn test_code_longer_than_body_stops_scan() {
    let mut data = Vec::new();
    // Body of 3 bytes declares a 5 byte code.
    data.extend_from_slice(&[0x0A, 0x03, 0x0A, 0x05, b'A']);
    let mut tail = RecordWriter::new();
    tail.push("US", &[1]).unwrap();
    data.extend_from_slice(&tail.finish());

    assert_all_modes(&data, "US", None);
    assert_all_modes(&data, "A", None);
}

#[test]
fn test_records_complete_blob_not_stopped_early() {
    let data = us_ca_blob();
    let mut records = Records::new(&data);
    let codes: Vec<&[u8]> = records.by_ref().map(|r| r.code).collect();
    assert_eq!(codes, vec![&b"US"[..], b"CA"]);
    assert!(!records.stopped_early());
}
