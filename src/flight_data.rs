// SPDX-License-Identifier: AGPL-3.0-only

//! Flight-data loader: SIMION recording output → paired tables.
//!
//! The recording file is a fixed-format text artifact:
//!   - exactly one header line among the first lines contains the quoted
//!     marker `"Ion N"`; its comma-separated, individually quoted fields
//!     name the recorded columns,
//!   - numeric rows start at line 13 (12 data-free header lines — a contract
//!     with SIMION's recording output, not configurable),
//!   - rows alternate strictly: row 2k is the initial state of ion k,
//!     row 2k+1 its final state.
//!
//! `load` splits by row parity into an initial and a final table of equal
//! length; the pairing is positional only (no foreign key), so an odd total
//! row count is rejected outright rather than truncated.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::VmiError;

/// Substring identifying the sole header line in a recording file.
pub const HEADER_MARKER: &str = "\"Ion N\"";

/// Data-free lines before the first numeric row (0-indexed skip offset).
pub const HEADER_LINES: usize = 12;

/// One parsed view of recorded ion states: ordered column labels over
/// row-major `f64` data, with by-name column lookup.
///
/// Created fresh on every load, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct FlightTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<f64>>,
}

impl FlightTable {
    /// Build a table directly from labels and row-major data.
    ///
    /// The loader is the normal source of tables; this exists for penalty
    /// code that wants to score synthetic states.
    #[must_use]
    pub fn from_columns(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self::new(columns, rows)
    }

    fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            columns,
            index,
            rows,
        }
    }

    /// Column labels in recorded order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows (ions) in this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `i` as a slice aligned with `columns()`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Position of a named column.
    ///
    /// # Errors
    ///
    /// `MissingColumn` if the recording did not carry that field.
    pub fn column_index(&self, name: &str) -> Result<usize, VmiError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| VmiError::MissingColumn { name: name.into() })
    }

    /// All values of a named column, in row order.
    ///
    /// # Errors
    ///
    /// `MissingColumn` if the recording did not carry that field.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, VmiError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Parse a recording file into `(initial, final)` tables.
///
/// Reads the file once; nothing on disk is mutated or deleted.
///
/// # Errors
///
/// - `MissingHeader` if no line contains [`HEADER_MARKER`],
/// - `MalformedRow` (with the 1-based file line) for a bad float token or a
///   field count differing from the header,
/// - `OddRowCount` if the body rows do not pair up,
/// - `Io` for read failures.
pub fn load(path: &Path) -> Result<(FlightTable, FlightTable), VmiError> {
    let text = fs::read_to_string(path)?;

    let columns = parse_header(&text, path)?;
    let rows = parse_body(&text, columns.len())?;

    if rows.len() % 2 != 0 {
        return Err(VmiError::OddRowCount { rows: rows.len() });
    }

    // Parity split: even rows are initial states, odd rows final states.
    // Both sides reindex densely, preserving per-ion order.
    let mut initial = Vec::with_capacity(rows.len() / 2);
    let mut fin = Vec::with_capacity(rows.len() / 2);
    for (i, row) in rows.into_iter().enumerate() {
        if i % 2 == 0 {
            initial.push(row);
        } else {
            fin.push(row);
        }
    }

    Ok((
        FlightTable::new(columns.clone(), initial),
        FlightTable::new(columns, fin),
    ))
}

/// Scan from the top for the marker line and split it into field names.
/// Stops at the first hit; everything above it is ignored.
fn parse_header(text: &str, path: &Path) -> Result<Vec<String>, VmiError> {
    for line in text.lines() {
        if line.contains(HEADER_MARKER) {
            return Ok(line
                .trim_end_matches(['\n', '\r'])
                .split(',')
                .map(strip_quotes)
                .collect());
        }
    }
    Err(VmiError::MissingHeader {
        path: path.to_path_buf(),
        marker: HEADER_MARKER,
    })
}

/// Strip exactly one layer of enclosing double quotes, if present.
///
/// An unquoted field passes through unchanged (the recording format quotes
/// every header field, but a blind slice would corrupt a bare one).
fn strip_quotes(field: &str) -> String {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(field)
        .to_string()
}

/// Parse numeric rows from the fixed offset onward.
fn parse_body(text: &str, width: usize) -> Result<Vec<Vec<f64>>, VmiError> {
    let mut rows = Vec::new();

    for (i, line) in text.lines().enumerate().skip(HEADER_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;

        let mut row = Vec::with_capacity(width);
        for token in line.split(',') {
            let token = token.trim();
            let value: f64 = token.parse().map_err(|_| VmiError::MalformedRow {
                line: line_no,
                reason: format!("bad float token {token:?}"),
            })?;
            row.push(value);
        }

        if row.len() != width {
            return Err(VmiError::MalformedRow {
                line: line_no,
                reason: format!("expected {width} fields, got {}", row.len()),
            });
        }
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_quotes_one_layer() {
        assert_eq!(strip_quotes("\"KE\""), "KE");
        assert_eq!(strip_quotes("\"\"KE\"\""), "\"KE\"");
        assert_eq!(strip_quotes("KE"), "KE");
    }

    #[test]
    fn strip_quotes_unbalanced_left_alone() {
        assert_eq!(strip_quotes("\"KE"), "\"KE");
        assert_eq!(strip_quotes("KE\""), "KE\"");
    }

    #[test]
    fn header_found_and_split() {
        let text = "banner\n\"Ion N\",\"KE\",\"Y\"\nrest\n";
        let cols = parse_header(text, Path::new("x.txt")).unwrap();
        assert_eq!(cols, vec!["Ion N", "KE", "Y"]);
    }

    #[test]
    fn header_missing_is_format_error() {
        let err = parse_header("no marker here\n", Path::new("x.txt")).unwrap_err();
        assert!(matches!(err, VmiError::MissingHeader { .. }));
    }

    #[test]
    fn body_reports_offending_line() {
        // 12 filler lines, then one good and one bad row.
        let mut text = "filler\n".repeat(HEADER_LINES);
        text.push_str("1.0,2.0\n1.0,oops\n");
        let err = parse_body(&text, 2).unwrap_err();
        match err {
            VmiError::MalformedRow { line, .. } => assert_eq!(line, 14),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn body_rejects_ragged_row() {
        let mut text = "filler\n".repeat(HEADER_LINES);
        text.push_str("1.0,2.0,3.0\n");
        let err = parse_body(&text, 2).unwrap_err();
        match err {
            VmiError::MalformedRow { line, reason } => {
                assert_eq!(line, 13);
                assert!(reason.contains("expected 2 fields"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn column_lookup_by_name() {
        let table = FlightTable::new(
            vec!["Ion N".into(), "KE".into(), "Y".into()],
            vec![vec![1.0, 0.5, 3.0], vec![2.0, 0.5, 4.0]],
        );
        assert_eq!(table.column("Y").unwrap(), vec![3.0, 4.0]);
        assert_eq!(table.column_index("KE").unwrap(), 1);
        assert!(matches!(
            table.column("TOF"),
            Err(VmiError::MissingColumn { .. })
        ));
    }
}
