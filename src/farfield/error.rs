// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Error type for all near-to-far-field-related errors.
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Near2FarError {
    #[error(
        "monitor '{name}' must be planar; its size {size:?} does not have \
         exactly one zero component"
    )]
    NonPlanarMonitor { name: String, size: [f64; 3] },

    #[error("no data for monitor named '{0}' found in the simulation data")]
    MissingMonitor(String),

    #[error(
        "the number of monitors ({monitors}) does not equal the number of \
         normal directions ({dirs})"
    )]
    MonitorCountMismatch { monitors: usize, dirs: usize },

    #[error("frequency {freq} Hz not found in the fields of monitor '{monitor}'")]
    FrequencyNotFound { freq: f64, monitor: String },

    #[error(
        "monitor '{monitor}' does not store the tangential {component} \
         component needed for surface currents"
    )]
    MissingFieldComponent { monitor: String, component: String },

    #[error("the local origin must be finite, got {0:?}")]
    NonFiniteOrigin([f64; 3]),

    #[error("at least one surface is required")]
    NoSurfaces,
}
