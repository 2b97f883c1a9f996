// SPDX-License-Identifier: AGPL-3.0-only

//! Check harness for validation binaries.
//!
//! Validation binaries follow one pattern:
//!   - hardcoded expected values,
//!   - explicit pass/fail checks against documented tolerances,
//!   - exit code 0 (all checks pass) or 1 (any check fails),
//!   - human-readable summary on stdout.

use std::process;

/// A single labeled check.
#[derive(Debug, Clone)]
pub struct Check {
    /// Human-readable label.
    pub label: String,
    /// Whether this check passed.
    pub passed: bool,
    /// One-line detail (observed vs expected).
    pub detail: String,
}

/// Accumulates checks and produces a summary with exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct Harness {
    /// Name of the validation binary.
    pub name: String,
    /// All checks performed.
    pub checks: Vec<Check>,
}

impl Harness {
    /// New harness for a named validation binary.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    /// Exact equality check (for values that must match bit for bit).
    pub fn check_exact(&mut self, label: &str, observed: f64, expected: f64) {
        self.push(
            label,
            observed == expected,
            format!("observed {observed}, expected exactly {expected}"),
        );
    }

    /// Absolute tolerance check: |observed - expected| < tolerance.
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        self.push(
            label,
            (observed - expected).abs() < tolerance,
            format!("observed {observed}, expected {expected} ± {tolerance}"),
        );
    }

    /// Boolean check.
    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(label, passed, String::new());
    }

    fn push(&mut self, label: &str, passed: bool, detail: String) {
        let mark = if passed { "PASS" } else { "FAIL" };
        if detail.is_empty() {
            println!("  [{mark}] {label}");
        } else {
            println!("  [{mark}] {label} — {detail}");
        }
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            detail,
        });
    }

    /// True when every check so far has passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Print the summary and exit 0 (all pass) or 1.
    pub fn finish(self) -> ! {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let total = self.checks.len();
        println!();
        println!("  {}: {passed}/{total} checks passed", self.name);
        for check in self.checks.iter().filter(|c| !c.passed) {
            println!("    FAILED: {} {}", check.label, check.detail);
        }
        process::exit(i32::from(!self.all_passed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_checks_accumulate() {
        let mut harness = Harness::new("t");
        harness.check_exact("exact", 4.0, 4.0);
        harness.check_abs("close", 1.0001, 1.0, 1e-3);
        harness.check_bool("flag", true);
        assert!(harness.all_passed());
        assert_eq!(harness.checks.len(), 3);
    }

    #[test]
    fn failing_check_flips_summary() {
        let mut harness = Harness::new("t");
        harness.check_exact("exact", 4.0, 5.0);
        assert!(!harness.all_passed());
    }
}
