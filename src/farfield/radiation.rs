// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Radiation-vector integrals over one near-field surface.
//!
//! For every observation angle the tangential currents are integrated
//! against the Fourier phase kernel `exp(−i·k·(r̂·r′))` with 2D trapezoidal
//! quadrature, then combined into the radiation vectors N_θ, N_φ, L_θ, L_φ
//! (Balanis 8.33–8.34). The θ loop runs in parallel; every θ writes a
//! disjoint output row, and the later sum across surfaces is associative,
//! so the ordering is immaterial.

use indicatif::ProgressBar;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use super::{currents::SurfaceCurrents, surface::Near2FarSurface};
use crate::{monitor::pop_axis, c64};

/// The four radiation vectors of one surface at one frequency, each shaped
/// `(|θ|, |φ|)`.
pub(crate) struct SurfaceRadiation {
    pub(crate) n_theta: Array2<c64>,
    pub(crate) n_phi: Array2<c64>,
    pub(crate) l_theta: Array2<c64>,
    pub(crate) l_phi: Array2<c64>,
}

/// Integrate the currents of one surface at one frequency index.
pub(crate) fn radiation_vectors_for_surface(
    k: c64,
    theta: &Array1<f64>,
    phi: &Array1<f64>,
    surface: &Near2FarSurface,
    currents: &SurfaceCurrents,
    freq_index: usize,
    origin: [f64; 3],
    progress: &ProgressBar,
) -> SurfaceRadiation {
    let axis = surface.axis();
    let (idx_w, (idx_u, idx_v)) = pop_axis([0usize, 1, 2], axis);

    // Phase reference at the local origin.
    let pts: [Array1<f64>; 3] =
        [0, 1, 2].map(|a| currents.pts[a].mapv(|p| p - origin[a]));
    let pts_u = &pts[idx_u];
    let pts_v = &pts[idx_v];
    let pt_w = pts[idx_w][0];

    let j_u = currents.j_u.index_axis(Axis(2), freq_index);
    let j_v = currents.j_v.index_axis(Axis(2), freq_index);
    let m_u = currents.m_u.index_axis(Axis(2), freq_index);
    let m_v = currents.m_v.index_axis(Axis(2), freq_index);

    let w_u = trapezoid_weights(pts_u);
    let w_v = trapezoid_weights(pts_v);
    let propagation = -c64::i() * k;

    let num_phi = phi.len();
    let rows: Vec<[Vec<c64>; 4]> = (0..theta.len())
        .into_par_iter()
        .map(|i_th| {
            let sin_th = theta[i_th].sin();
            let cos_th = theta[i_th].cos();
            let mut row = [
                vec![c64::new(0.0, 0.0); num_phi],
                vec![c64::new(0.0, 0.0); num_phi],
                vec![c64::new(0.0, 0.0); num_phi],
                vec![c64::new(0.0, 0.0); num_phi],
            ];
            for j_ph in 0..num_phi {
                let (sin_ph, cos_ph) = phi[j_ph].sin_cos();
                // Direction cosines along x, y, z.
                let cosines = [sin_th * cos_ph, sin_th * sin_ph, cos_th];

                // Per-axis phase factors, folded with the quadrature
                // weights where they enter the double integral.
                let phase_u: Vec<c64> = pts_u
                    .iter()
                    .zip(w_u.iter())
                    .map(|(&p, &w)| (propagation * p * cosines[idx_u]).exp() * w)
                    .collect();
                let phase_v: Vec<c64> = pts_v
                    .iter()
                    .zip(w_v.iter())
                    .map(|(&p, &w)| (propagation * p * cosines[idx_v]).exp() * w)
                    .collect();
                let phase_w = (propagation * pt_w * cosines[idx_w]).exp();

                let mut j = [c64::new(0.0, 0.0); 3];
                let mut m = [c64::new(0.0, 0.0); 3];
                j[idx_u] = integrate_2d(j_u, &phase_u, &phase_v) * phase_w;
                j[idx_v] = integrate_2d(j_v, &phase_u, &phase_v) * phase_w;
                m[idx_u] = integrate_2d(m_u, &phase_u, &phase_v) * phase_w;
                m[idx_v] = integrate_2d(m_v, &phase_u, &phase_v) * phase_w;

                let cos_th_cos_ph = cos_th * cos_ph;
                let cos_th_sin_ph = cos_th * sin_ph;
                row[0][j_ph] = j[0] * cos_th_cos_ph + j[1] * cos_th_sin_ph - j[2] * sin_th;
                row[1][j_ph] = -j[0] * sin_ph + j[1] * cos_ph;
                row[2][j_ph] = m[0] * cos_th_cos_ph + m[1] * cos_th_sin_ph - m[2] * sin_th;
                row[3][j_ph] = -m[0] * sin_ph + m[1] * cos_ph;
            }
            progress.inc(1);
            row
        })
        .collect();

    let mut out = SurfaceRadiation {
        n_theta: Array2::zeros((theta.len(), num_phi)),
        n_phi: Array2::zeros((theta.len(), num_phi)),
        l_theta: Array2::zeros((theta.len(), num_phi)),
        l_phi: Array2::zeros((theta.len(), num_phi)),
    };
    for (i_th, row) in rows.into_iter().enumerate() {
        for j_ph in 0..num_phi {
            out.n_theta[(i_th, j_ph)] = row[0][j_ph];
            out.n_phi[(i_th, j_ph)] = row[1][j_ph];
            out.l_theta[(i_th, j_ph)] = row[2][j_ph];
            out.l_phi[(i_th, j_ph)] = row[3][j_ph];
        }
    }
    out
}

/// Trapezoidal quadrature weights for (possibly non-uniform) sample
/// positions. A single sample integrates to zero, like a degenerate
/// trapezoid.
fn trapezoid_weights(pts: &Array1<f64>) -> Vec<f64> {
    let n = pts.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut w = vec![0.0; n];
    w[0] = (pts[1] - pts[0]) / 2.0;
    for i in 1..n - 1 {
        w[i] = (pts[i + 1] - pts[i - 1]) / 2.0;
    }
    w[n - 1] = (pts[n - 1] - pts[n - 2]) / 2.0;
    w
}

/// `Σ_{u,v} f(u,v)·a(u)·b(v)` with the quadrature weights folded into the
/// phase vectors.
fn integrate_2d(f: ArrayView2<c64>, a: &[c64], b: &[c64]) -> c64 {
    let mut total = c64::new(0.0, 0.0);
    for (u, &au) in a.iter().enumerate() {
        let mut inner = c64::new(0.0, 0.0);
        for (v, &bv) in b.iter().enumerate() {
            inner += f[(u, v)] * bv;
        }
        total += inner * au;
    }
    total
}
