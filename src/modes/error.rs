// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Error type for all mode-solver-related errors.
 */

use thiserror::Error;

use crate::linalg::LinalgError;

#[derive(Error, Debug)]
pub enum ModeError {
    #[error(
        "the permittivity cross-section must be one 2D array or three 2D arrays \
         of equal shape; component {component} has shape {got:?}, expected {expected:?}"
    )]
    InvalidPermittivityShape {
        component: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error(
        "'coords' does not match the permittivity shape: expected ({0}, {1}) \
         boundary positions, got ({2}, {3})"
    )]
    CoordsMismatch(usize, usize, usize, usize),

    #[error("could not find any eigenmodes near target n_eff = {target_neff}")]
    NoEigenmodesFound { target_neff: f64 },

    #[error("invalid mode spec: {0}")]
    InvalidModeSpec(String),

    #[error("{0}")]
    Linalg(#[from] LinalgError),
}
