// SPDX-License-Identifier: AGPL-3.0-only
#![allow(clippy::unwrap_used)]

//! Integration tests: flight-data loader public API.
//!
//! Exercises the recording-file contract end to end: header discovery and
//! quote stripping, the fixed 12-line numeric offset, parity splitting, and
//! every loader failure mode.

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use vmi_tuner::error::VmiError;
use vmi_tuner::flight_data::{self, HEADER_LINES};

/// Write a recording artifact: banner, quoted header at line 2, filler
/// through line 12, the given numeric lines from line 13.
fn write_recording(dir: &tempfile::TempDir, name: &str, body: &[&str]) -> PathBuf {
    let mut text = String::from("Begin Fly'm\n\"Ion N\",\"KE\",\"Y\"\n");
    for _ in 2..HEADER_LINES {
        text.push_str("------\n");
    }
    for line in body {
        text.push_str(line);
        text.push('\n');
    }
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn header_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(
        &dir,
        "ok.txt",
        &["1,0.5,0.0", "1,0.5,1.0", "2,1.5,0.0", "2,1.5,2.0"],
    );

    let (initial, fin) = flight_data::load(&path).unwrap();
    assert_eq!(initial.columns(), &["Ion N", "KE", "Y"]);
    assert_eq!(fin.columns(), &["Ion N", "KE", "Y"]);
}

#[test]
fn pairing_invariant_splits_by_parity() {
    let dir = tempfile::tempdir().unwrap();
    // Y values encode the original body row number so provenance is checkable.
    let path = write_recording(
        &dir,
        "pairs.txt",
        &[
            "1,0.5,100.0",
            "1,0.5,101.0",
            "2,1.5,102.0",
            "2,1.5,103.0",
            "3,2.5,104.0",
            "3,2.5,105.0",
        ],
    );

    let (initial, fin) = flight_data::load(&path).unwrap();
    assert_eq!(initial.len(), 3);
    assert_eq!(fin.len(), 3);
    for i in 0..3 {
        // Row i of each table came from body rows 2i and 2i+1.
        assert_eq!(initial.row(i)[2], 100.0 + 2.0 * i as f64);
        assert_eq!(fin.row(i)[2], 101.0 + 2.0 * i as f64);
    }
}

#[test]
fn odd_row_count_is_rejected_not_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "odd.txt", &["1,0.5,0.0", "1,0.5,1.0", "2,1.5,0.0"]);

    match flight_data::load(&path) {
        Err(VmiError::OddRowCount { rows }) => assert_eq!(rows, 3),
        other => panic!("expected OddRowCount, got {other:?}"),
    }
}

#[test]
fn missing_marker_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nomarker.txt");
    fs::write(&path, "just\nsome\nnoise\n").unwrap();

    assert!(matches!(
        flight_data::load(&path),
        Err(VmiError::MissingHeader { .. })
    ));
}

#[test]
fn malformed_row_names_file_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "bad.txt", &["1,0.5,0.0", "1,0.5,not_a_number"]);

    match flight_data::load(&path) {
        Err(VmiError::MalformedRow { line, reason }) => {
            // Body starts at line 13; the bad row is the second body line.
            assert_eq!(line, 14);
            assert!(reason.contains("not_a_number"));
        }
        other => panic!("expected MalformedRow, got {other:?}"),
    }
}

#[test]
fn ragged_row_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "ragged.txt", &["1,0.5,0.0,9.9", "1,0.5,1.0"]);

    match flight_data::load(&path) {
        Err(VmiError::MalformedRow { line, reason }) => {
            assert_eq!(line, 13);
            assert!(reason.contains("expected 3 fields"));
        }
        other => panic!("expected MalformedRow, got {other:?}"),
    }
}

#[test]
fn column_lookup_fails_explicitly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "cols.txt", &["1,0.5,0.0", "1,0.5,1.0"]);

    let (initial, _) = flight_data::load(&path).unwrap();
    assert_eq!(initial.column("KE").unwrap(), vec![0.5]);
    match initial.column("TOF") {
        Err(VmiError::MissingColumn { name }) => assert_eq!(name, "TOF"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn trailing_blank_lines_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "blank.txt", &["1,0.5,0.0", "1,0.5,1.0", ""]);

    let (initial, fin) = flight_data::load(&path).unwrap();
    assert_eq!(initial.len(), 1);
    assert_eq!(fin.len(), 1);
}

#[test]
fn loader_does_not_consume_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_recording(&dir, "keep.txt", &["1,0.5,0.0", "1,0.5,1.0"]);

    flight_data::load(&path).unwrap();
    assert!(path.exists());
    // A second load sees identical content.
    let (initial, _) = flight_data::load(&path).unwrap();
    assert_eq!(initial.row(0)[1], 0.5);
}
