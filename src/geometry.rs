// SPDX-License-Identifier: AGPL-3.0-only

//! SIMION `.gem` geometry rendering.
//!
//! A geometry file is plain text: one `pa_define` line fixing the workspace
//! (cylindrical, electrostatic), then one electrode block per lens. Each
//! electrode is a corner-box annulus: it starts at the cumulative axial
//! position of its segment, leaves the bore open, and extends radially to
//! two grid points short of the chamber wall.

use std::fs;
use std::path::Path;

use crate::error::VmiError;
use crate::instrument::InstrumentSpec;

/// One corner-box electrode region, 1-indexed as SIMION expects.
#[must_use]
pub fn electrode_region(
    index: usize,
    z_start: u32,
    inner_radius: u32,
    width: u32,
    radial_extent: u32,
) -> String {
    format!(
        "electrode({index}) {{ fill {{ within  {{ corner_box({z_start}, {inner_radius}, {width}, {radial_extent}) }} }} }}\n"
    )
}

/// Render the full `.gem` text for an instrument.
#[must_use]
pub fn render(spec: &InstrumentSpec) -> String {
    let mut gem = format!(
        "pa_define({}, {}, 1, cylindrical, electrostatic)\n",
        spec.total_length(),
        spec.radius
    );

    for i in 0..spec.n_electrodes() {
        let inner_radius = spec.inner_diameters[i] / 2;
        gem.push_str(&electrode_region(
            i + 1,
            spec.electrode_start(i),
            inner_radius,
            spec.electrode_width,
            spec.radius.saturating_sub(inner_radius + 2),
        ));
    }

    gem
}

/// Write `{stem}.gem` for an instrument.
///
/// # Errors
///
/// `Io` on write failure.
pub fn write_gem(spec: &InstrumentSpec, stem: &Path) -> Result<(), VmiError> {
    fs::write(stem.with_extension("gem"), render(spec))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn electrode_region_text() {
        assert_eq!(
            electrode_region(1, 1, 3, 1, 96),
            "electrode(1) { fill { within  { corner_box(1, 3, 1, 96) } } }\n"
        );
    }

    #[test]
    fn render_default_stack() {
        let gem = render(&InstrumentSpec::default());
        let lines: Vec<&str> = gem.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "pa_define(368, 101, 1, cylindrical, electrostatic)");
        // First electrode: starts at 1, bore radius 3, extends to 101-3-2.
        assert!(lines[1].contains("corner_box(1, 3, 1, 96)"));
        // Last electrode is a solid plate (bore 0).
        assert!(lines[5].contains("corner_box(365, 0, 1, 99)"));
    }
}
