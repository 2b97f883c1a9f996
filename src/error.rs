// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for the tuning workflow.
//!
//! One enum covers the whole pipeline so callers can pattern-match on
//! failure modes (missing header, malformed row, broken pairing, simulator
//! exit) rather than parsing opaque strings. Nothing here is retried: any
//! error aborts the evaluation it occurred in, and — under the default
//! failure policy — the optimization run with it.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors arising from flight-data parsing, simulator invocation, or the
/// voltage search.
#[derive(Debug, Error)]
pub enum VmiError {
    /// No header line containing the `"Ion N"` marker before end of file.
    #[error("no flight-data header line (marker {marker:?}) found in {path}")]
    MissingHeader {
        /// File that was scanned.
        path: PathBuf,
        /// The marker token that was searched for.
        marker: &'static str,
    },

    /// A data row failed to parse as comma-separated floats.
    #[error("malformed flight-data row at line {line}: {reason}")]
    MalformedRow {
        /// 1-based line number in the source file.
        line: usize,
        /// What was wrong (bad token, field-count mismatch).
        reason: String,
    },

    /// Total data row count is odd — the initial/final pairing is broken.
    #[error("flight data has {rows} rows; expected an even count of initial/final pairs")]
    OddRowCount {
        /// Total number of data rows found.
        rows: usize,
    },

    /// A by-name field lookup over a loaded table failed.
    #[error("flight data has no column named {name:?}")]
    MissingColumn {
        /// The field name that was requested.
        name: String,
    },

    /// The voltage ladder is too short to address the adjustable channels.
    #[error("voltage ladder needs at least 2 entries, got {len}")]
    ShortLadder {
        /// Number of entries supplied.
        len: usize,
    },

    /// The external simulator exited non-zero (or could not report a status).
    #[error("simulator command `{command}` failed with {status}")]
    Simulator {
        /// The full command line that was run.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },

    /// The minimization driver itself failed (degenerate simplex etc.).
    #[error("voltage optimizer failed: {0}")]
    Optimizer(String),

    /// Underlying file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_header() {
        let err = VmiError::MissingHeader {
            path: PathBuf::from("data.txt"),
            marker: "\"Ion N\"",
        };
        let msg = err.to_string();
        assert!(msg.contains("Ion N"));
        assert!(msg.contains("data.txt"));
    }

    #[test]
    fn display_malformed_row_names_line() {
        let err = VmiError::MalformedRow {
            line: 17,
            reason: "invalid float literal".into(),
        };
        assert!(err.to_string().contains("line 17"));
    }

    #[test]
    fn display_odd_row_count() {
        let err = VmiError::OddRowCount { rows: 5 };
        assert!(err.to_string().contains("5 rows"));
    }

    #[test]
    fn display_missing_column() {
        let err = VmiError::MissingColumn { name: "KE".into() };
        assert!(err.to_string().contains("\"KE\""));
    }

    #[test]
    fn error_trait_works() {
        let err = VmiError::ShortLadder { len: 1 };
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("got 1"));
    }
}
