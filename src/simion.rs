// SPDX-License-Identifier: AGPL-3.0-only

//! External simulator command surface.
//!
//! SIMION is reached as a command-line executable; every operation here
//! blocks until the external process exits. A hung simulator hangs the run —
//! there is no timeout or cancellation, matching the strictly sequential
//! evaluation model.
//!
//! The `Simulator` trait is the seam the cost evaluator works against:
//! `SimionCli` is the production implementation, `CannedSimulator` replays a
//! prepared recording for validation binaries and integration tests.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::VmiError;

/// The operations one penalty evaluation needs from the simulator.
pub trait Simulator {
    /// Apply per-channel voltage overrides to an existing potential array
    /// without a full refine.
    ///
    /// # Errors
    ///
    /// `Simulator` on non-zero exit, `Io` if the process cannot start.
    fn fast_adjust(&self, workspace: &str, channels: &[(u32, f64)]) -> Result<(), VmiError>;

    /// Fly ions through the workspace, recording into `{output}.txt`.
    ///
    /// Any stale artifact at the output path is deleted first, so at most
    /// one current artifact exists per output stem. The delete/recreate
    /// window is not atomic; callers must not run two evaluations against
    /// the same stems concurrently.
    ///
    /// # Errors
    ///
    /// `Simulator` on non-zero exit, `Io` if the process cannot start or
    /// the stale artifact cannot be removed.
    fn fly(&self, workspace: &str, recording: &str, output: &str) -> Result<(), VmiError>;

    /// Remove `*.tmp` scratch files left behind by a run. Best effort:
    /// failures are ignored and never abort an evaluation.
    fn sweep_scratch(&self);
}

/// Production SIMION invocation via its command-line executable.
#[derive(Debug, Clone)]
pub struct SimionCli {
    executable: PathBuf,
    work_dir: PathBuf,
}

impl SimionCli {
    /// Address a SIMION executable, running in `work_dir`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Directory all artifacts live in.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run the executable with `--nogui` plus `args`, blocking until exit.
    fn run(&self, args: &[String]) -> Result<(), VmiError> {
        let status = Command::new(&self.executable)
            .arg("--nogui")
            .args(args)
            .current_dir(&self.work_dir)
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(VmiError::Simulator {
                command: format!(
                    "{} --nogui {}",
                    self.executable.display(),
                    args.join(" ")
                ),
                status,
            })
        }
    }

    /// Build and refine potential arrays from `{stem}.gem`.
    ///
    /// Two external calls: `gem2pa` materializes the `.pa#` master array,
    /// `refine` iterates it to convergence.
    ///
    /// # Errors
    ///
    /// `Simulator` on non-zero exit from either step.
    pub fn build_arrays(&self, stem: &str) -> Result<(), VmiError> {
        tracing::info!(stem, "building potential arrays");
        self.run(&["gem2pa".into(), format!("{stem}.gem"), format!("{stem}.pa#")])?;
        self.run(&[
            "refine".into(),
            "--convergence=1e-3".into(),
            format!("{stem}.pa#"),
        ])
    }
}

impl Simulator for SimionCli {
    fn fast_adjust(&self, workspace: &str, channels: &[(u32, f64)]) -> Result<(), VmiError> {
        let mut overrides = String::new();
        for (i, (channel, voltage)) in channels.iter().enumerate() {
            if i > 0 {
                overrides.push(',');
            }
            let _ = write!(overrides, "{channel}={voltage}");
        }
        tracing::debug!(workspace, %overrides, "fast adjust");
        self.run(&["fastadj".into(), format!("{workspace}.pa0"), overrides])
    }

    fn fly(&self, workspace: &str, recording: &str, output: &str) -> Result<(), VmiError> {
        let artifact = self.work_dir.join(format!("{output}.txt"));
        if artifact.exists() {
            fs::remove_file(&artifact)?;
        }

        tracing::debug!(workspace, recording, output, "flying ions");
        self.run(&[
            "fly".into(),
            "--particles=ions.fly2".into(),
            "--restore-potentials=0".into(),
            format!("--recording={recording}.rec"),
            format!("--recording-output={output}.txt"),
            format!("{workspace}.iob"),
        ])
    }

    fn sweep_scratch(&self) {
        let Ok(entries) = fs::read_dir(&self.work_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                let _ = fs::remove_file(path);
            }
        }
    }
}

/// Replays a prepared recording instead of invoking SIMION.
///
/// `fly` writes the canned text to `{output}.txt` in the work directory;
/// voltage overrides are recorded for inspection. Backs the `validate_focus`
/// binary and the integration tests, where a real simulator is unavailable.
#[derive(Debug)]
pub struct CannedSimulator {
    work_dir: PathBuf,
    recording_text: String,
    adjustments: RefCell<Vec<Vec<(u32, f64)>>>,
}

impl CannedSimulator {
    /// Canned simulator writing `recording_text` on every `fly`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>, recording_text: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            recording_text: recording_text.into(),
            adjustments: RefCell::new(Vec::new()),
        }
    }

    /// All fast-adjust channel maps seen so far, in call order.
    #[must_use]
    pub fn adjustments(&self) -> Vec<Vec<(u32, f64)>> {
        self.adjustments.borrow().clone()
    }
}

impl Simulator for CannedSimulator {
    fn fast_adjust(&self, _workspace: &str, channels: &[(u32, f64)]) -> Result<(), VmiError> {
        self.adjustments.borrow_mut().push(channels.to_vec());
        Ok(())
    }

    fn fly(&self, _workspace: &str, _recording: &str, output: &str) -> Result<(), VmiError> {
        let artifact = self.work_dir.join(format!("{output}.txt"));
        if artifact.exists() {
            fs::remove_file(&artifact)?;
        }
        fs::write(artifact, &self.recording_text)?;
        Ok(())
    }

    fn sweep_scratch(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_fly_writes_artifact() {
        let dir = std::env::temp_dir().join("vmi_tuner_canned_fly");
        fs::create_dir_all(&dir).unwrap();
        let sim = CannedSimulator::new(&dir, "hello\n");
        sim.fly("ws", "rec", "canned_out").unwrap();
        let text = fs::read_to_string(dir.join("canned_out.txt")).unwrap();
        assert_eq!(text, "hello\n");
        let _ = fs::remove_file(dir.join("canned_out.txt"));
    }

    #[test]
    fn canned_records_adjustments() {
        let sim = CannedSimulator::new(std::env::temp_dir(), "");
        sim.fast_adjust("ws", &[(1, 4500.0), (2, 3000.0)]).unwrap();
        assert_eq!(sim.adjustments(), vec![vec![(1, 4500.0), (2, 3000.0)]]);
    }

    #[test]
    fn cli_missing_executable_is_io_error() {
        let sim = SimionCli::new("/nonexistent/simion", std::env::temp_dir());
        let err = sim.build_arrays("geom").unwrap_err();
        assert!(matches!(err, VmiError::Io(_)));
    }
}
