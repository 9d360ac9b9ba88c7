// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The primal (Yee cell boundary) grid of a simulation.

use ndarray::Array1;

/// Primal grid boundaries along each axis. Cell centres are derived as the
/// midpoints of successive boundaries.
#[derive(Clone, Debug)]
pub struct Grid {
    /// Positions of the cell boundaries along x, y, z \[µm\]. Each array is
    /// monotone increasing with at least two entries.
    pub boundaries: [Array1<f64>; 3],
}

impl Grid {
    pub fn new(boundaries: [Array1<f64>; 3]) -> Grid {
        Grid { boundaries }
    }

    /// A uniform grid covering `center ± size/2` with `cells` cells per axis.
    pub fn uniform(center: [f64; 3], size: [f64; 3], cells: [usize; 3]) -> Grid {
        let boundaries = [0, 1, 2].map(|axis| {
            let n = cells[axis].max(1);
            let start = center[axis] - size[axis] / 2.0;
            let step = size[axis] / n as f64;
            Array1::from_iter((0..=n).map(|i| start + step * i as f64))
        });
        Grid::new(boundaries)
    }

    /// Cell-centre positions along `axis`.
    pub fn centers(&self, axis: usize) -> Array1<f64> {
        let b = &self.boundaries[axis];
        Array1::from_iter(b.windows(2).into_iter().map(|w| (w[0] + w[1]) / 2.0))
    }
}
