// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Waveguide eigenmode solver and near-field to far-field projector for
//! FDTD electromagnetics.
//!
//! Two numerical engines live here: [`modes::compute_modes`], which finds
//! the transverse eigenmodes of a translationally-invariant waveguide cross
//! section, and [`farfield::Near2Far`], which projects tangential near
//! fields recorded on closed surfaces to far-field radiation vectors.

pub mod constants;
pub(crate) mod error;
pub mod farfield;
pub mod field_data;
pub mod grid;
pub(crate) mod linalg;
pub mod medium;
pub mod modes;
pub mod monitor;
pub mod sim_data;

// Re-exports.
pub use error::WavefarerError;
pub use farfield::{Near2Far, Near2FarError, Near2FarSurface, RadiationVectors};
pub use field_data::{FieldData, ScalarFieldArray};
pub use grid::Grid;
pub use linalg::LinalgError;
pub use medium::Medium;
pub use modes::{
    compute_modes, EpsCross, ModeError, ModeSolverResult, ModeSpec, SortBy, Symmetry,
};
pub use monitor::{Direction, FieldMonitor};
pub use sim_data::{Simulation, SimulationData};

/// A shorthand for the double-precision complex scalar used throughout.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;
