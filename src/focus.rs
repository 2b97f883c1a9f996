// SPDX-License-Identifier: AGPL-3.0-only

//! The VMI focus penalty.
//!
//! Ions that leave the interaction region with the same kinetic energy
//! should land on the same detector Y coordinate under ideal velocity-map
//! focusing; any spread within an energy group is imaging error. The
//! penalty is the sum of squared Y spreads over all distinct initial-KE
//! groups, plus a flat 500 for every adjacent voltage pair that increases
//! (the electrode ladder is designed to decrease monotonically).
//!
//! `FocusObjective::evaluate` is the black-box objective: one call is one
//! full external round trip (fast adjust, fly, parse), which dominates the
//! runtime of the whole search.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::VmiError;
use crate::flight_data::{self, FlightTable};
use crate::simion::Simulator;

/// Fixed reference voltage on electrode channel 1 (the repeller).
pub const REFERENCE_VOLTAGE: f64 = 4500.0;

/// Flat penalty added per increasing adjacent pair in the voltage ladder.
pub const LADDER_PENALTY: f64 = 500.0;

/// Initial-state field used as the grouping key.
pub const KE_FIELD: &str = "KE";

/// Final-state field whose spread is minimized.
pub const Y_FIELD: &str = "Y";

/// Squared final-Y spread summed over distinct initial-KE groups.
///
/// Grouping compares kinetic energies for exact equality (bit patterns, no
/// tolerance banding): rows are correlated across the two tables purely by
/// position, so `initial` row i and `fin` row i describe the same ion.
///
/// # Errors
///
/// `MissingColumn` if the recording lacks `KE` or `Y`.
pub fn grouping_penalty(initial: &FlightTable, fin: &FlightTable) -> Result<f64, VmiError> {
    let ke = initial.column(KE_FIELD)?;
    let y = fin.column(Y_FIELD)?;
    debug_assert_eq!(ke.len(), y.len(), "tables must pair row for row");

    let mut spread: HashMap<u64, (f64, f64)> = HashMap::new();
    for (&energy, &y_pos) in ke.iter().zip(&y) {
        let entry = spread.entry(energy.to_bits()).or_insert((y_pos, y_pos));
        entry.0 = entry.0.min(y_pos);
        entry.1 = entry.1.max(y_pos);
    }

    Ok(spread.values().map(|(lo, hi)| (hi - lo).powi(2)).sum())
}

/// Flat penalty for every increasing adjacent pair in the ladder.
#[must_use]
pub fn ladder_penalty(voltages: &[f64]) -> f64 {
    let increasing = voltages.windows(2).filter(|w| w[1] > w[0]).count();
    increasing as f64 * LADDER_PENALTY
}

/// The black-box objective for one workspace/recording/data triple.
///
/// Holds the artifact stems across evaluations; each evaluation overwrites
/// the data artifact, so one objective must not be evaluated concurrently.
pub struct FocusObjective<'a, S: Simulator> {
    sim: &'a S,
    work_dir: PathBuf,
    workspace: String,
    recording: String,
    data: String,
}

impl<'a, S: Simulator> FocusObjective<'a, S> {
    /// Objective over the named artifact stems, resolved in `work_dir`.
    #[must_use]
    pub fn new(
        sim: &'a S,
        work_dir: impl Into<PathBuf>,
        workspace: &str,
        recording: &str,
        data: &str,
    ) -> Self {
        Self {
            sim,
            work_dir: work_dir.into(),
            workspace: workspace.to_string(),
            recording: recording.to_string(),
            data: data.to_string(),
        }
    }

    /// One full evaluation: fast adjust, fly, parse, score.
    ///
    /// Channel 1 stays at [`REFERENCE_VOLTAGE`]; channels 2 and 3 take the
    /// first two ladder entries; channels 4 and 5 are grounded. Voltage
    /// magnitudes and signs are forwarded unvalidated. The whole ladder
    /// participates in the monotonicity term.
    ///
    /// # Errors
    ///
    /// Simulator and loader failures propagate unmodified; there is no
    /// retry. Scratch-file cleanup failures are swallowed.
    pub fn evaluate(&self, voltages: &[f64]) -> Result<f64, VmiError> {
        if voltages.len() < 2 {
            return Err(VmiError::ShortLadder {
                len: voltages.len(),
            });
        }

        tracing::debug!(?voltages, workspace = %self.workspace, "evaluating ladder");
        self.sim.fast_adjust(
            &self.workspace,
            &[
                (1, REFERENCE_VOLTAGE),
                (2, voltages[0]),
                (3, voltages[1]),
                (4, 0.0),
                (5, 0.0),
            ],
        )?;
        self.sim.fly(&self.workspace, &self.recording, &self.data)?;

        let artifact = self.work_dir.join(format!("{}.txt", self.data));
        let (initial, fin) = flight_data::load(&artifact)?;
        self.sim.sweep_scratch();

        let penalty = grouping_penalty(&initial, &fin)? + ladder_penalty(voltages);
        println!("  [eval] penalty = {penalty:.6}");
        Ok(penalty)
    }
}
