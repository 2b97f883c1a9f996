// SPDX-License-Identifier: AGPL-3.0-only

//! Electrode stack description.
//!
//! An instrument spec lists the lens stack in flight order: per-electrode
//! segment lengths and inner (bore) diameters, the chamber radius, and the
//! common electrode width. Specs load from JSON so alternative stacks can
//! be tried without recompiling; `Default` is the reference VMI stack.
//!
//! All dimensions are in grid units (mm at the default grid density).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::VmiError;

/// Geometry of one lens stack, in flight order.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentSpec {
    /// Axial segment length preceding each electrode.
    pub lens_lengths: Vec<u32>,
    /// Inner (bore) diameter of each electrode; 0 = solid plate.
    pub inner_diameters: Vec<u32>,
    /// Chamber radius, including one grid point of spacing.
    pub radius: u32,
    /// Axial width of every electrode.
    #[serde(default = "default_electrode_width")]
    pub electrode_width: u32,
}

fn default_electrode_width() -> u32 {
    1
}

impl Default for InstrumentSpec {
    /// The reference five-electrode VMI stack.
    fn default() -> Self {
        Self {
            lens_lengths: vec![1, 14, 21, 29, 300],
            inner_diameters: vec![6, 12, 32, 50, 0],
            radius: 101,
            electrode_width: 1,
        }
    }
}

impl InstrumentSpec {
    /// Load a spec from a JSON file.
    ///
    /// # Errors
    ///
    /// `Io` on read failure; JSON shape errors and a lengths/diameters
    /// count mismatch are reported as invalid-data `Io` errors.
    pub fn from_json(path: &Path) -> Result<Self, VmiError> {
        let file = File::open(path)?;
        let spec: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Number of electrodes in the stack.
    #[must_use]
    pub fn n_electrodes(&self) -> usize {
        self.lens_lengths.len()
    }

    /// Total workspace length: all segments plus one electrode width plus
    /// one free grid point on either side.
    #[must_use]
    pub fn total_length(&self) -> u32 {
        self.lens_lengths.iter().sum::<u32>() + self.electrode_width + 2
    }

    /// Axial start position of electrode `i` (0-based): cumulative segment
    /// length through segment `i`.
    #[must_use]
    pub fn electrode_start(&self, i: usize) -> u32 {
        self.lens_lengths[..=i].iter().sum()
    }

    fn validate(&self) -> Result<(), VmiError> {
        if self.lens_lengths.len() != self.inner_diameters.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "instrument spec: {} lens lengths but {} inner diameters",
                    self.lens_lengths.len(),
                    self.inner_diameters.len()
                ),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stack_dimensions() {
        let spec = InstrumentSpec::default();
        assert_eq!(spec.n_electrodes(), 5);
        // 1+14+21+29+300 segments + width 1 + 2 free points
        assert_eq!(spec.total_length(), 368);
    }

    #[test]
    fn electrode_starts_accumulate() {
        let spec = InstrumentSpec::default();
        assert_eq!(spec.electrode_start(0), 1);
        assert_eq!(spec.electrode_start(1), 15);
        assert_eq!(spec.electrode_start(4), 365);
    }

    #[test]
    fn json_round_trip() {
        let json = r#"{
            "lens_lengths": [2, 10],
            "inner_diameters": [4, 8],
            "radius": 51
        }"#;
        let spec: InstrumentSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.electrode_width, 1);
        assert_eq!(spec.total_length(), 15);
    }

    #[test]
    fn mismatched_arrays_rejected() {
        let spec = InstrumentSpec {
            lens_lengths: vec![1, 2],
            inner_diameters: vec![4],
            radius: 51,
            electrode_width: 1,
        };
        assert!(spec.validate().is_err());
    }
}
