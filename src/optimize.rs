// SPDX-License-Identifier: AGPL-3.0-only

//! Nelder-Mead search over the voltage ladder.
//!
//! The objective is expensive: every simplex evaluation is a full external
//! simulation round trip, so iteration budgets here are counted in minutes,
//! not microseconds. The search is strictly sequential; no evaluations run
//! concurrently and no results are memoized.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gomez::algo::NelderMead;
use gomez::nalgebra as na;
use gomez::{Domain, Function, OptimizerDriver, Problem};
use na::{Dyn, IsContiguous};
use serde::Serialize;

use crate::error::VmiError;
use crate::focus::FocusObjective;
use crate::simion::Simulator;

/// Penalty assigned to a failed sample under `FailurePolicy::Penalize`.
///
/// Large enough to dominate any physical penalty, but finite so the simplex
/// arithmetic stays well-defined.
pub const FAILED_SAMPLE_PENALTY: f64 = 1e12;

/// What to do when a single evaluation fails mid-search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the driver at the first failure and propagate the error.
    #[default]
    Abort,
    /// Score the failed sample [`FAILED_SAMPLE_PENALTY`] and keep searching.
    Penalize,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "penalize" => Ok(Self::Penalize),
            other => Err(format!("unknown failure policy {other:?} (abort|penalize)")),
        }
    }
}

/// Search budget and stop criteria.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum driver iterations (each costs at least one simulation).
    pub max_iters: usize,
    /// Stop early once the penalty drops to this value or below.
    pub target_penalty: Option<f64>,
    /// Mid-search failure handling.
    pub failure_policy: FailurePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            target_penalty: None,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Outcome of one voltage search.
#[derive(Debug, Clone, Serialize)]
pub struct FocusResult {
    /// Best ladder found.
    pub voltages: Vec<f64>,
    /// Penalty at the best ladder.
    pub penalty: f64,
    /// Driver iterations used.
    pub iterations: usize,
}

/// Serializable run report, written next to the data artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct FocusReport {
    /// When the search finished.
    pub finished_at: DateTime<Utc>,
    /// Workspace stem the search ran against.
    pub workspace: String,
    /// Initial ladder guess.
    pub initial_voltages: Vec<f64>,
    /// Search outcome.
    pub result: FocusResult,
}

impl FocusReport {
    /// Stamp a finished search.
    #[must_use]
    pub fn new(workspace: &str, initial_voltages: &[f64], result: FocusResult) -> Self {
        Self {
            finished_at: Utc::now(),
            workspace: workspace.to_string(),
            initial_voltages: initial_voltages.to_vec(),
            result,
        }
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// `Io` on write failure.
    pub fn write_json(&self, path: &Path) -> Result<(), VmiError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// `gomez` problem wrapper: infallible function surface over a fallible
/// evaluation, with the first error parked for the driver loop to see and
/// the best successfully evaluated ladder tracked across calls.
struct VoltageProblem<'a, S: Simulator> {
    objective: &'a FocusObjective<'a, S>,
    dim: usize,
    policy: FailurePolicy,
    failure: RefCell<Option<VmiError>>,
    best: RefCell<Option<(Vec<f64>, f64)>>,
}

impl<S: Simulator> VoltageProblem<'_, S> {
    fn failed(&self) -> bool {
        self.failure.borrow().is_some()
    }

    fn record_best(&self, x: &[f64], penalty: f64) {
        let mut best = self.best.borrow_mut();
        if best.as_ref().is_none_or(|(_, fx)| penalty < *fx) {
            *best = Some((x.to_vec(), penalty));
        }
    }
}

impl<S: Simulator> Problem for VoltageProblem<'_, S> {
    type Field = f64;

    fn domain(&self) -> Domain<Self::Field> {
        Domain::unconstrained(self.dim)
    }
}

impl<S: Simulator> Function for VoltageProblem<'_, S> {
    fn apply<Sx>(&self, x: &na::Vector<Self::Field, Dyn, Sx>) -> Self::Field
    where
        Sx: na::Storage<Self::Field, Dyn> + IsContiguous,
    {
        match self.objective.evaluate(x.as_slice()) {
            Ok(penalty) => {
                self.record_best(x.as_slice(), penalty);
                penalty
            }
            Err(err) => {
                match self.policy {
                    FailurePolicy::Penalize => {
                        tracing::warn!(error = %err, "evaluation failed; penalizing sample");
                    }
                    FailurePolicy::Abort => {
                        let mut slot = self.failure.borrow_mut();
                        if slot.is_none() {
                            *slot = Some(err);
                        }
                    }
                }
                FAILED_SAMPLE_PENALTY
            }
        }
    }
}

/// Minimize the focus penalty from `initial`, returning the best ladder.
///
/// # Errors
///
/// `ShortLadder` for fewer than two voltages; under `FailurePolicy::Abort`,
/// the first simulator/loader error from any evaluation; `Optimizer` if the
/// Nelder-Mead driver fails before a single evaluation succeeded. A driver
/// stop after successful evaluations (plateau collapse) yields the best
/// ladder found instead.
pub fn optimize_voltages<S: Simulator>(
    objective: &FocusObjective<'_, S>,
    initial: &[f64],
    config: &SearchConfig,
) -> Result<FocusResult, VmiError> {
    if initial.len() < 2 {
        return Err(VmiError::ShortLadder { len: initial.len() });
    }

    let problem = VoltageProblem {
        objective,
        dim: initial.len(),
        policy: config.failure_policy,
        failure: RefCell::new(None),
        best: RefCell::new(None),
    };

    let mut driver = OptimizerDriver::builder(&problem)
        .with_initial(initial.to_vec())
        .with_algo(|f, dom| NelderMead::new(f, dom))
        .build();

    // `find` takes an `Fn` closure; the iteration count escapes via a Cell.
    let iterations = Cell::new(0);
    let outcome = driver.find(|state| {
        iterations.set(state.iter());
        problem.failed()
            || state.iter() >= config.max_iters
            || config.target_penalty.is_some_and(|t| state.fx() <= t)
    });

    if let Some(err) = problem.failure.borrow_mut().take() {
        return Err(err);
    }

    match outcome {
        Ok((x, fx)) => Ok(FocusResult {
            voltages: x.to_vec(),
            penalty: fx,
            iterations: iterations.get(),
        }),
        // Nelder-Mead reports simplex degeneracy on a plateau instead of
        // converging; with at least one evaluated ladder in hand that is a
        // stop condition, not a failure.
        Err(err) => match problem.best.borrow_mut().take() {
            Some((voltages, penalty)) => {
                tracing::debug!(error = %err, "driver stopped early; keeping best ladder");
                Ok(FocusResult {
                    voltages,
                    penalty,
                    iterations: iterations.get(),
                })
            }
            None => Err(VmiError::Optimizer(err.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_parses() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!(
            "Penalize".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Penalize
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn report_serializes() {
        let report = FocusReport::new(
            "test",
            &[3000.0, 100.0],
            FocusResult {
                voltages: vec![2870.0, 95.0],
                penalty: 0.25,
                iterations: 40,
            },
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"workspace\":\"test\""));
        assert!(json.contains("\"penalty\":0.25"));
    }

    #[test]
    fn default_config_aborts() {
        let config = SearchConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.target_penalty.is_none());
    }
}
