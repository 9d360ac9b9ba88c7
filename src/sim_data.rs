// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simulation-level data: the simulation description plus the recorded data
//! of every monitor, keyed by monitor name.

use std::collections::HashMap;

use ndarray::Array1;

use crate::{field_data::FieldData, grid::Grid, medium::Medium, monitor::FieldMonitor};

/// The geometry and background of a simulation. Only the parts the far-field
/// projector consumes: domain bounds, background medium and the primal grid.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Centre of the simulation domain \[µm\].
    pub center: [f64; 3],

    /// Extent of the simulation domain \[µm\].
    pub size: [f64; 3],

    /// Background medium of the simulation.
    pub medium: Medium,

    /// Primal grid of the simulation.
    pub grid: Grid,
}

impl Simulation {
    /// Lower and upper bounds of the domain along `axis` \[µm\].
    pub fn bounds(&self, axis: usize) -> (f64, f64) {
        (
            self.center[axis] - self.size[axis] / 2.0,
            self.center[axis] + self.size[axis] / 2.0,
        )
    }
}

/// Data recorded by all monitors of a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationData {
    pub simulation: Simulation,

    /// Mapping of monitor name to its recorded field data.
    pub monitor_data: HashMap<String, FieldData>,
}

impl SimulationData {
    /// The recorded field data of the named monitor, if present.
    pub fn field_data(&self, name: &str) -> Option<&FieldData> {
        self.monitor_data.get(name)
    }

    /// Yee-cell-centre colocation points covered by `monitor`. Flat monitor
    /// axes collapse to the single plane position; the others are the grid
    /// centres clipped to the monitor extent.
    pub fn at_centers(&self, monitor: &FieldMonitor) -> [Array1<f64>; 3] {
        [0, 1, 2].map(|axis| {
            if monitor.size[axis] == 0.0 {
                return Array1::from(vec![monitor.center[axis]]);
            }
            let (lo, hi) = monitor.bounds(axis);
            let centers = self.simulation.grid.centers(axis);
            Array1::from_iter(centers.iter().copied().filter(|&c| c >= lo && c <= hi))
        })
    }
}
