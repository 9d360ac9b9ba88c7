// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sparse finite-difference operators on the 2D cross-section grid.
//!
//! The grid is raveled with `index(i, j) = j·Nx + i`, so x-neighbours are
//! adjacent matrix columns and y-neighbours sit `Nx` apart. Forward
//! operators difference towards larger coordinates and drop the coefficient
//! beyond the last cell, which forces the field to zero there (PEC at the
//! far boundary). Backward operators drop the coefficient before the first
//! cell (PEC) or zero the boundary row when the near boundary is a PMC
//! mirror.

use log::warn;
use ndarray::Array1;
use sprs::{CsMat, TriMat};

use crate::{
    constants::{EPSILON_0, ETA_0, PML_CURVE_ORDER, PML_SIGMA_WARN, PML_TARGET_LN_R},
    c64,
};

/// The four derivative matrices `(Dxf, Dxb, Dyf, Dyb)`, each `N×N` with
/// `N = Nx·Ny`. A degenerate axis (single cell) produces zero matrices.
pub(crate) fn create_d_matrices(
    shape: (usize, usize),
    dl_f: &[Array1<f64>; 2],
    dl_b: &[Array1<f64>; 2],
    dmin_pmc: [bool; 2],
) -> [CsMat<c64>; 4] {
    let (nx, ny) = shape;
    let n = nx * ny;
    let index = |i: usize, j: usize| j * nx + i;

    let mut dxf = TriMat::new((n, n));
    let mut dxb = TriMat::new((n, n));
    if nx > 1 {
        for j in 0..ny {
            for i in 0..nx {
                let row = index(i, j);
                let inv_f = c64::new(1.0 / dl_f[0][i], 0.0);
                dxf.add_triplet(row, row, -inv_f);
                if i + 1 < nx {
                    dxf.add_triplet(row, index(i + 1, j), inv_f);
                }

                let inv_b = c64::new(1.0 / dl_b[0][i], 0.0);
                if i > 0 {
                    dxb.add_triplet(row, row, inv_b);
                    dxb.add_triplet(row, index(i - 1, j), -inv_b);
                } else if !dmin_pmc[0] {
                    dxb.add_triplet(row, row, inv_b);
                }
                // A PMC near boundary mirrors the adjacent cell, so the
                // backward derivative on the boundary row vanishes.
            }
        }
    }

    let mut dyf = TriMat::new((n, n));
    let mut dyb = TriMat::new((n, n));
    if ny > 1 {
        for j in 0..ny {
            for i in 0..nx {
                let row = index(i, j);
                let inv_f = c64::new(1.0 / dl_f[1][j], 0.0);
                dyf.add_triplet(row, row, -inv_f);
                if j + 1 < ny {
                    dyf.add_triplet(row, index(i, j + 1), inv_f);
                }

                let inv_b = c64::new(1.0 / dl_b[1][j], 0.0);
                if j > 0 {
                    dyb.add_triplet(row, row, inv_b);
                    dyb.add_triplet(row, index(i, j - 1), -inv_b);
                } else if !dmin_pmc[1] {
                    dyb.add_triplet(row, row, inv_b);
                }
            }
        }
    }

    [dxf.to_csr(), dxb.to_csr(), dyf.to_csr(), dyb.to_csr()]
}

/// The four diagonal PML matrices `(Sxf, Sxb, Syf, Syb)`: reciprocal
/// complex stretch factors matching the sample positions of the four
/// derivative matrices. With `dmin_pml[axis]` false, the near edge of that
/// axis gets no layer (used when a symmetry plane sits there).
pub(crate) fn create_s_matrices(
    omega: f64,
    shape: (usize, usize),
    num_pml: (usize, usize),
    dl_f: &[Array1<f64>; 2],
    dmin_pml: [bool; 2],
) -> [CsMat<c64>; 4] {
    let (nx, ny) = shape;
    let n = nx * ny;
    let index = |i: usize, j: usize| j * nx + i;

    // Forward factors sample at half-integer cell offsets, backward at
    // integer offsets.
    let sx_f = stretch_factors(omega, nx, num_pml.0, &dl_f[0], dmin_pml[0], 0.5);
    let sx_b = stretch_factors(omega, nx, num_pml.0, &dl_f[0], dmin_pml[0], 0.0);
    let sy_f = stretch_factors(omega, ny, num_pml.1, &dl_f[1], dmin_pml[1], 0.5);
    let sy_b = stretch_factors(omega, ny, num_pml.1, &dl_f[1], dmin_pml[1], 0.0);

    let diag_from_x = |s: &[c64]| -> CsMat<c64> {
        let mut tri = TriMat::new((n, n));
        for j in 0..ny {
            for i in 0..nx {
                tri.add_triplet(index(i, j), index(i, j), s[i].inv());
            }
        }
        tri.to_csr()
    };
    let diag_from_y = |s: &[c64]| -> CsMat<c64> {
        let mut tri = TriMat::new((n, n));
        for j in 0..ny {
            for i in 0..nx {
                tri.add_triplet(index(i, j), index(i, j), s[j].inv());
            }
        }
        tri.to_csr()
    };

    [
        diag_from_x(&sx_f),
        diag_from_x(&sx_b),
        diag_from_y(&sy_f),
        diag_from_y(&sy_b),
    ]
}

/// Complex coordinate-stretch factors `s = 1 − i·σ/(ω·ε₀)` along one axis,
/// sampled at cell offset `t = i + offset`. σ rises as an order-3
/// polynomial from the inner PML edge to `σ_max` at the outer edge.
fn stretch_factors(
    omega: f64,
    n: usize,
    n_pml: usize,
    dl: &Array1<f64>,
    dmin_pml: bool,
    offset: f64,
) -> Vec<c64> {
    let mut s = vec![c64::new(1.0, 0.0); n];
    if n_pml == 0 || n == 0 {
        return s;
    }
    let n_pml = n_pml.min(n);

    // Layer thicknesses from the local grid steps.
    let d_near: f64 = dl.iter().take(n_pml).sum();
    let d_far: f64 = dl.iter().rev().take(n_pml).sum();
    let sigma_max = |d: f64| -(PML_CURVE_ORDER + 1.0) * PML_TARGET_LN_R / (2.0 * ETA_0 * d);
    if sigma_max(d_near).max(sigma_max(d_far)) > PML_SIGMA_WARN {
        warn!(
            "PML conductivity exceeds {PML_SIGMA_WARN}; the layer is too thin \
             to absorb adiabatically"
        );
    }

    for (i, s_i) in s.iter_mut().enumerate() {
        let t = i as f64 + offset;
        let depth_near = n_pml as f64 - t;
        let depth_far = t - (n - n_pml) as f64;
        let sigma = if depth_near > 0.0 && dmin_pml {
            sigma_max(d_near) * (depth_near / n_pml as f64).powf(PML_CURVE_ORDER)
        } else if depth_far > 0.0 {
            sigma_max(d_far) * (depth_far / n_pml as f64).powf(PML_CURVE_ORDER)
        } else {
            0.0
        };
        if sigma != 0.0 {
            *s_i = c64::new(1.0, -sigma / (omega * EPSILON_0));
        }
    }
    s
}
