// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense eigendecomposition of complex upper-Hessenberg matrices.
//!
//! The Arnoldi driver projects the sparse problem onto a small Krylov basis;
//! the projected matrix is upper Hessenberg. Its Schur form is computed with
//! single-shift QR sweeps (complex Givens rotations, Wilkinson shifts,
//! occasional exceptional shifts) and the eigenvectors follow from
//! back-substitution on the triangular factor.

use ndarray::{Array1, Array2};
use num_traits::Zero;

use super::LinalgError;
use crate::c64;

/// Eigenvalues and (unit-norm, column-wise) eigenvectors of an upper
/// Hessenberg matrix.
pub(crate) fn hessenberg_eig(h: &Array2<c64>) -> Result<(Array1<c64>, Array2<c64>), LinalgError> {
    let n = h.nrows();
    assert_eq!(n, h.ncols());
    if n == 0 {
        return Ok((Array1::zeros(0), Array2::zeros((0, 0))));
    }

    let (t, q) = hessenberg_schur(h)?;
    let x = triangular_eigenvectors(&t);
    let eigvecs = q.dot(&x);
    let eigvals = Array1::from_iter((0..n).map(|k| t[(k, k)]));
    Ok((eigvals, eigvecs))
}

/// Schur decomposition `H = Q·T·Qᴴ` of an upper Hessenberg matrix.
fn hessenberg_schur(h: &Array2<c64>) -> Result<(Array2<c64>, Array2<c64>), LinalgError> {
    let n = h.nrows();
    let mut t = h.clone();
    let mut q = Array2::eye(n);
    if n == 1 {
        return Ok((t, q));
    }

    // Absolute deflation floor for rows whose local scale vanishes.
    let smlnum = f64::MIN_POSITIVE / f64::EPSILON;
    let max_sweeps = 40 * n;
    let mut sweeps = 0;
    let mut since_deflation = 0;

    let mut hi = n;
    while hi > 1 {
        // Find the start of the active block: the first negligible
        // subdiagonal entry scanning up from the bottom.
        let mut lo = hi - 1;
        while lo > 0 {
            let off = t[(lo, lo - 1)].norm();
            let scale = t[(lo - 1, lo - 1)].norm() + t[(lo, lo)].norm();
            if off <= (f64::EPSILON * scale).max(smlnum) {
                t[(lo, lo - 1)] = c64::zero();
                break;
            }
            lo -= 1;
        }
        if lo == hi - 1 {
            // 1x1 block converged.
            hi -= 1;
            since_deflation = 0;
            continue;
        }

        sweeps += 1;
        since_deflation += 1;
        if sweeps > max_sweeps {
            return Err(LinalgError::QrNoConvergence(sweeps));
        }

        let mu = if since_deflation % 10 == 0 {
            // Exceptional shift to break limit cycles.
            t[(hi - 1, hi - 1)] + c64::new(0.75 * t[(hi - 1, hi - 2)].norm(), 0.0)
        } else {
            wilkinson_shift(
                t[(hi - 2, hi - 2)],
                t[(hi - 2, hi - 1)],
                t[(hi - 1, hi - 2)],
                t[(hi - 1, hi - 1)],
            )
        };

        // One implicit single-shift QR sweep over the active block,
        // chasing the bulge with Givens rotations.
        let mut x = t[(lo, lo)] - mu;
        let mut y = t[(lo + 1, lo)];
        for k in lo..hi - 1 {
            let (c, s) = givens(x, y);

            // Rows k, k+1 from the left.
            let col_start = if k > lo { k - 1 } else { lo };
            for col in col_start..n {
                let t1 = t[(k, col)];
                let t2 = t[(k + 1, col)];
                t[(k, col)] = t1 * c + s * t2;
                t[(k + 1, col)] = -s.conj() * t1 + t2 * c;
            }
            // Columns k, k+1 from the right.
            let row_end = (k + 3).min(hi);
            for row in 0..row_end {
                let t1 = t[(row, k)];
                let t2 = t[(row, k + 1)];
                t[(row, k)] = t1 * c + s.conj() * t2;
                t[(row, k + 1)] = -s * t1 + t2 * c;
            }
            // Accumulate the similarity in Q.
            for row in 0..n {
                let q1 = q[(row, k)];
                let q2 = q[(row, k + 1)];
                q[(row, k)] = q1 * c + s.conj() * q2;
                q[(row, k + 1)] = -s * q1 + q2 * c;
            }

            if k + 2 < hi {
                x = t[(k + 1, k)];
                y = t[(k + 2, k)];
            }
        }
    }

    Ok((t, q))
}

/// The eigenvalue of the trailing 2x2 block closest to its last entry.
fn wilkinson_shift(a: c64, b: c64, c: c64, d: c64) -> c64 {
    let mean = (a + d) * 0.5;
    let disc = ((a - d) * 0.5).powi(2) + b * c;
    let root = disc.sqrt();
    let mu1 = mean + root;
    let mu2 = mean - root;
    if (mu1 - d).norm_sqr() < (mu2 - d).norm_sqr() {
        mu1
    } else {
        mu2
    }
}

/// A complex Givens rotation `G = [[c, s], [-s̄, c]]` (real `c`) such that
/// `G·(a, b)ᵀ` has a zero second component.
fn givens(a: c64, b: c64) -> (f64, c64) {
    let an = a.norm();
    let bn = b.norm();
    if bn == 0.0 {
        return (1.0, c64::zero());
    }
    let r = an.hypot(bn);
    if an == 0.0 {
        return (0.0, b.conj() / bn);
    }
    let alpha = a / an;
    (an / r, alpha * b.conj() / r)
}

/// Right eigenvectors of an upper triangular matrix by back-substitution.
fn triangular_eigenvectors(t: &Array2<c64>) -> Array2<c64> {
    let n = t.nrows();
    let tnorm = t.iter().map(|v| v.norm()).fold(0.0, f64::max);
    let smin = (f64::EPSILON * tnorm).max(f64::MIN_POSITIVE);

    let mut x = Array2::zeros((n, n));
    for k in 0..n {
        let lambda = t[(k, k)];
        x[(k, k)] = c64::new(1.0, 0.0);
        for i in (0..k).rev() {
            let mut acc = c64::zero();
            for j in i + 1..=k {
                acc += t[(i, j)] * x[(j, k)];
            }
            let mut denom = t[(i, i)] - lambda;
            if denom.norm() < smin {
                // Degenerate cluster: perturb the denominator instead of
                // dividing by zero. The resulting vector still spans the
                // invariant subspace to working precision.
                denom = c64::new(smin, 0.0);
            }
            x[(i, k)] = -acc / denom;
        }
        let norm = x.column(k).iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
        if norm > 0.0 {
            let inv = 1.0 / norm;
            for i in 0..=k {
                x[(i, k)] *= inv;
            }
        }
    }
    x
}
