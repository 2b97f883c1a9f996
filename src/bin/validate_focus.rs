// SPDX-License-Identifier: AGPL-3.0-only

//! Validate the flight-data loader and focus penalty against hand-computed
//! values.
//!
//! Runs entirely against synthetic recording artifacts (no SIMION needed).
//! Exit code 0 (all checks pass) or 1 (any check fails).

use std::fs;

use vmi_tuner::error::VmiError;
use vmi_tuner::flight_data;
use vmi_tuner::focus::{ladder_penalty, FocusObjective};
use vmi_tuner::simion::CannedSimulator;
use vmi_tuner::validation::Harness;

/// Build a recording artifact: banner line, quoted header at line 2, filler
/// through line 12, numeric rows from line 13.
fn recording(rows: &[[f64; 3]]) -> String {
    let mut text = String::from("Begin Fly'm\n\"Ion N\",\"KE\",\"Y\"\n");
    for _ in 2..12 {
        text.push_str("------\n");
    }
    for row in rows {
        text.push_str(&format!("{},{},{}\n", row[0], row[1], row[2]));
    }
    text
}

fn main() {
    println!("═══════════════════════════════════════════════════");
    println!("  VMI focus penalty validation");
    println!("  Reference: hand-computed spreads and ladders");
    println!("═══════════════════════════════════════════════════");
    println!();

    let mut harness = Harness::new("validate_focus");

    let dir = std::env::temp_dir().join(format!("validate_focus_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("failed to create scratch dir");

    // ── Loader: header round-trip and pairing ─────────────────────
    let path = dir.join("roundtrip.txt");
    fs::write(
        &path,
        recording(&[
            [1.0, 0.5, 0.0],
            [1.0, 0.5, 1.0],
            [2.0, 1.5, 0.0],
            [2.0, 1.5, 2.0],
        ]),
    )
    .expect("failed to write artifact");

    let (initial, fin) = flight_data::load(&path).expect("loader rejected well-formed artifact");
    harness.check_bool(
        "header round-trip: columns [Ion N, KE, Y]",
        initial.columns() == ["Ion N", "KE", "Y"],
    );
    harness.check_bool(
        "pairing: 4 body rows split 2/2",
        initial.len() == 2 && fin.len() == 2,
    );
    harness.check_exact("pairing: initial row 1 = body row 2", initial.row(1)[2], 0.0);
    harness.check_exact("pairing: final row 1 = body row 3", fin.row(1)[2], 2.0);

    // ── Loader: odd row count rejected ────────────────────────────
    let odd_path = dir.join("odd.txt");
    fs::write(
        &odd_path,
        recording(&[[1.0, 0.5, 0.0], [1.0, 0.5, 1.0], [2.0, 1.5, 0.0]]),
    )
    .expect("failed to write artifact");
    harness.check_bool(
        "odd body row count → OddRowCount",
        matches!(
            flight_data::load(&odd_path),
            Err(VmiError::OddRowCount { rows: 3 })
        ),
    );

    // ── Penalty: ladder monotonicity term ─────────────────────────
    harness.check_exact(
        "ladder [3000,3500,3200] → exactly one +500",
        ladder_penalty(&[3000.0, 3500.0, 3200.0]),
        500.0,
    );
    harness.check_exact(
        "non-increasing ladder → 0",
        ladder_penalty(&[3000.0, 100.0]),
        0.0,
    );

    // ── Penalty: end-to-end scenario ──────────────────────────────
    // Two energy groups of two ions: group A final Y {1, 1}, group B
    // final Y {2, 4}. Penalty = 0² + 2² = 4 with a non-increasing ladder.
    let canned = recording(&[
        [1.0, 0.5, 0.0],
        [1.0, 0.5, 1.0],
        [2.0, 0.5, 0.0],
        [2.0, 0.5, 1.0],
        [3.0, 1.5, 0.0],
        [3.0, 1.5, 2.0],
        [4.0, 1.5, 0.0],
        [4.0, 1.5, 4.0],
    ]);
    let sim = CannedSimulator::new(&dir, canned);
    let objective = FocusObjective::new(&sim, &dir, "ws", "rec", "e2e");
    match objective.evaluate(&[3000.0, 100.0]) {
        Ok(penalty) => harness.check_exact("end-to-end penalty = 4", penalty, 4.0),
        Err(e) => {
            println!("  end-to-end evaluation failed: {e}");
            harness.check_bool("end-to-end penalty = 4", false);
        }
    }

    // Zero spread in every group scores exactly zero.
    let flat = recording(&[
        [1.0, 0.5, 0.0],
        [1.0, 0.5, 7.5],
        [2.0, 0.5, 0.0],
        [2.0, 0.5, 7.5],
    ]);
    let sim = CannedSimulator::new(&dir, flat);
    let objective = FocusObjective::new(&sim, &dir, "ws", "rec", "flat");
    match objective.evaluate(&[3000.0, 100.0]) {
        Ok(penalty) => harness.check_exact("zero-spread penalty = 0", penalty, 0.0),
        Err(e) => {
            println!("  zero-spread evaluation failed: {e}");
            harness.check_bool("zero-spread penalty = 0", false);
        }
    }

    let _ = fs::remove_dir_all(&dir);

    harness.finish()
}
