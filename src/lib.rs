// SPDX-License-Identifier: AGPL-3.0-only

//! vmi-tuner — SIMION-driven velocity-map-imaging voltage tuner
//!
//! Automates a VMI focusing workflow around the SIMION ion-optics simulator,
//! reached as an external command-line executable: generate electrode
//! geometry, build and refine potential arrays, fast-adjust voltages, fly
//! ions, parse the recorded flight data, and minimize an imaging-focus
//! penalty over the electrode voltage ladder with Nelder-Mead.
//!
//! ## Modules
//!   - `instrument` — electrode stack description (lengths, bores, radius)
//!   - `geometry` — SIMION `.gem` file rendering
//!   - `simion` — the external simulator command surface (`gem2pa`, `refine`,
//!     `fastadj`, `fly`)
//!   - `flight_data` — recording-output parser → paired initial/final tables
//!   - `focus` — the VMI focus penalty (energy-group Y spread + voltage
//!     ladder monotonicity)
//!   - `optimize` — Nelder-Mead search over the voltage ladder
//!
//! ## Binaries
//!   - `tune_vmi` — operator entry point: build geometry, run the search,
//!     write a JSON run report
//!   - `validate_focus` — hardcoded pass/fail checks of the loader and
//!     penalty math, exit code 0/1
//!
//! Every penalty evaluation is one full external round trip (fast adjust,
//! fly, parse); the simulator call dominates runtime, so the whole crate is
//! synchronous and strictly sequential by design.

pub mod error;
pub mod flight_data;
pub mod focus;
pub mod geometry;
pub mod instrument;
pub mod optimize;
pub mod simion;
pub mod validation;

pub use error::VmiError;
