// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency-domain field data sampled on a rectilinear grid.
//!
//! Each scalar component carries its own coordinates: on a Yee grid the six
//! components of **E** and **H** are staggered, so colocating them onto a
//! common set of points is an explicit interpolation step.

use ndarray::{Array1, Array4, Axis};

use crate::c64;

/// A complex scalar field on a rectilinear `(x, y, z)` grid at a list of
/// frequencies. The value array has shape `(|x|, |y|, |z|, |freqs|)`.
#[derive(Clone, Debug)]
pub struct ScalarFieldArray {
    pub values: Array4<c64>,
    pub coords: [Array1<f64>; 3],
    pub freqs: Vec<f64>,
}

impl ScalarFieldArray {
    /// Panics if the value array shape does not match the coordinates.
    pub fn new(coords: [Array1<f64>; 3], freqs: Vec<f64>, values: Array4<c64>) -> ScalarFieldArray {
        assert_eq!(
            values.dim(),
            (coords[0].len(), coords[1].len(), coords[2].len(), freqs.len()),
            "scalar field shape does not match its coordinates"
        );
        ScalarFieldArray {
            values,
            coords,
            freqs,
        }
    }

    /// A copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: c64) -> ScalarFieldArray {
        ScalarFieldArray {
            values: self.values.mapv(|v| v * factor),
            coords: self.coords.clone(),
            freqs: self.freqs.clone(),
        }
    }

    /// Linearly interpolate this field onto new points along every axis.
    /// Points outside the sampled region are clamped to the boundary value.
    pub fn colocate(&self, pts: &[Array1<f64>; 3]) -> ScalarFieldArray {
        let mut values = self.values.clone();
        for axis in 0..3 {
            values = interp_axis(&values, &self.coords[axis], &pts[axis], axis);
        }
        ScalarFieldArray {
            values,
            coords: [pts[0].clone(), pts[1].clone(), pts[2].clone()],
            freqs: self.freqs.clone(),
        }
    }
}

/// Indices and weight for linear interpolation at `t`: the interpolated
/// value is `(1 − w)·v[i0] + w·v[i1]`. Out-of-range targets clamp.
fn interp_weights(coords: &Array1<f64>, t: f64) -> (usize, usize, f64) {
    let n = coords.len();
    if n == 1 {
        return (0, 0, 0.0);
    }
    // Number of coordinates strictly below t.
    let below = coords.iter().take_while(|&&c| c < t).count();
    if below == 0 {
        return (0, 0, 0.0);
    }
    if below == n {
        return (n - 1, n - 1, 0.0);
    }
    let (i0, i1) = (below - 1, below);
    let span = coords[i1] - coords[i0];
    let w = if span > 0.0 { (t - coords[i0]) / span } else { 0.0 };
    (i0, i1, w)
}

/// Interpolate a 4D array along one axis onto `targets`.
fn interp_axis(
    values: &Array4<c64>,
    coords: &Array1<f64>,
    targets: &Array1<f64>,
    axis: usize,
) -> Array4<c64> {
    let mut dim = values.dim();
    match axis {
        0 => dim.0 = targets.len(),
        1 => dim.1 = targets.len(),
        2 => dim.2 = targets.len(),
        _ => unreachable!(),
    }
    let mut out = Array4::zeros(dim);
    for (k, &t) in targets.iter().enumerate() {
        let (i0, i1, w) = interp_weights(coords, t);
        let lo = values.index_axis(Axis(axis), i0);
        let hi = values.index_axis(Axis(axis), i1);
        let interpolated = &lo * c64::new(1.0 - w, 0.0) + &hi * c64::new(w, 0.0);
        out.index_axis_mut(Axis(axis), k).assign(&interpolated);
    }
    out
}

/// The scalar components of **E** and **H** recorded by a field monitor,
/// indexed by axis. Components a monitor did not record are `None`.
#[derive(Clone, Debug, Default)]
pub struct FieldData {
    pub e: [Option<ScalarFieldArray>; 3],
    pub h: [Option<ScalarFieldArray>; 3],
}

impl FieldData {
    /// A copy with every stored component multiplied by `factor`.
    pub fn scaled(&self, factor: c64) -> FieldData {
        let scale =
            |c: &[Option<ScalarFieldArray>; 3]| -> [Option<ScalarFieldArray>; 3] {
                [0, 1, 2].map(|i| c[i].as_ref().map(|f| f.scaled(factor)))
            };
        FieldData {
            e: scale(&self.e),
            h: scale(&self.h),
        }
    }
}
