// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Assembly of the sparse operator whose eigenpairs are the waveguide
//! modes.
//!
//! With diagonal ε and μ the problem closes on the transverse electric
//! field alone: `M = P·Q` acts on `(Ex, Ey)` and has eigenvalues
//! `−(n_eff + i·k_eff)²`. Off-diagonal material tensors (bends composed
//! with tilts, or anisotropic media) couple all four transverse components;
//! the 4×4 block operator acts on `(Ex, Ey, Hx, Hy)` with eigenvalues
//! `i·(n_eff + i·k_eff)`.

use ndarray::{Array3, ArrayView1};
use sprs::{CsMat, TriMat};

use crate::c64;

/// Threshold on off-diagonal ε/μ entries above which the full tensorial
/// operator is required.
pub(crate) const OFF_DIAGONAL_THRESHOLD: f64 = 1e-6;

pub(crate) fn has_off_diagonal(tensor: &Array3<c64>) -> bool {
    let n = tensor.dim().2;
    for r in 0..3 {
        for c in 0..3 {
            if r == c {
                continue;
            }
            for p in 0..n {
                if tensor[(r, c, p)].norm() > OFF_DIAGONAL_THRESHOLD {
                    return true;
                }
            }
        }
    }
    false
}

/// Sparse diagonal matrix from per-point values.
pub(crate) fn spdiag(values: ArrayView1<c64>) -> CsMat<c64> {
    let n = values.len();
    let mut tri = TriMat::new((n, n));
    for (p, &v) in values.iter().enumerate() {
        tri.add_triplet(p, p, v);
    }
    tri.to_csr()
}

fn neg(mat: &CsMat<c64>) -> CsMat<c64> {
    mat.map(|&v| -v)
}

/// Stack equally-sized square blocks into one sparse matrix.
pub(crate) fn sp_block(blocks: &[Vec<&CsMat<c64>>]) -> CsMat<c64> {
    let n = blocks[0][0].rows();
    let rows = blocks.len();
    let cols = blocks[0].len();
    let mut tri = TriMat::new((rows * n, cols * n));
    for (bi, row_blocks) in blocks.iter().enumerate() {
        assert_eq!(row_blocks.len(), cols);
        for (bj, block) in row_blocks.iter().enumerate() {
            assert_eq!(block.rows(), n);
            assert_eq!(block.cols(), n);
            for (row, row_vec) in block.outer_iterator().enumerate() {
                for (col, &val) in row_vec.iter() {
                    tri.add_triplet(bi * n + row, bj * n + col, val);
                }
            }
        }
    }
    tri.to_csr()
}

/// The diagonal-regime operator, kept in factored form because the
/// magnetic field is recovered from `Q` after the eigensolve.
pub(crate) struct DiagonalOperator {
    pub(crate) qmat: CsMat<c64>,
    pub(crate) mat: CsMat<c64>,
}

/// `M = P·Q` for diagonal ε and μ.
pub(crate) fn assemble_diagonal(
    eps: &Array3<c64>,
    mu: &Array3<c64>,
    der_mats: &[CsMat<c64>; 4],
) -> DiagonalOperator {
    let [dxf, dxb, dyf, dyb] = der_mats;

    let inv_eps_zz = spdiag(eps.slice(ndarray::s![2, 2, ..]).mapv(|v| v.inv()).view());
    let inv_mu_zz = spdiag(mu.slice(ndarray::s![2, 2, ..]).mapv(|v| v.inv()).view());
    let eps_xx = spdiag(eps.slice(ndarray::s![0, 0, ..]));
    let eps_yy = spdiag(eps.slice(ndarray::s![1, 1, ..]));
    let mu_xx = spdiag(mu.slice(ndarray::s![0, 0, ..]));
    let mu_yy = spdiag(mu.slice(ndarray::s![1, 1, ..]));

    let p11 = neg(&(&(dxf * &inv_eps_zz) * dyb));
    let p12 = &(&(dxf * &inv_eps_zz) * dxb) + &mu_yy;
    let p21 = &neg(&(&(dyf * &inv_eps_zz) * dyb)) + &neg(&mu_xx);
    let p22 = &(dyf * &inv_eps_zz) * dxb;
    let q11 = neg(&(&(dxb * &inv_mu_zz) * dyf));
    let q12 = &(&(dxb * &inv_mu_zz) * dxf) + &eps_yy;
    let q21 = &neg(&(&(dyb * &inv_mu_zz) * dyf)) + &neg(&eps_xx);
    let q22 = &(dyb * &inv_mu_zz) * dxf;

    let pmat = sp_block(&[vec![&p11, &p12], vec![&p21, &p22]]);
    let qmat = sp_block(&[vec![&q11, &q12], vec![&q21, &q22]]);
    let mat = &pmat * &qmat;

    DiagonalOperator { qmat, mat }
}

/// The 4×4 block operator with all off-diagonal ε/μ couplings.
pub(crate) fn assemble_tensorial(
    eps: &Array3<c64>,
    mu: &Array3<c64>,
    der_mats: &[CsMat<c64>; 4],
) -> CsMat<c64> {
    let [dxf, dxb, dyf, dyb] = der_mats;

    // Per-point diagonal helpers: T[a,b]/T[2,2] and the Schur-style
    // reductions T[a,b] − T[a,2]·T[2,b]/T[2,2].
    let ratio = |t: &Array3<c64>, a: usize, b: usize| -> CsMat<c64> {
        let n = t.dim().2;
        spdiag(
            ndarray::Array1::from_iter((0..n).map(|p| t[(a, b, p)] / t[(2, 2, p)])).view(),
        )
    };
    let reduced = |t: &Array3<c64>, sign: f64, a: usize, b: usize| -> CsMat<c64> {
        let n = t.dim().2;
        spdiag(
            ndarray::Array1::from_iter((0..n).map(|p| {
                (t[(a, b, p)] - t[(a, 2, p)] * t[(2, b, p)] / t[(2, 2, p)]) * sign
            }))
            .view(),
        )
    };
    let inv_eps_zz = spdiag(eps.slice(ndarray::s![2, 2, ..]).mapv(|v| v.inv()).view());
    let inv_mu_zz = spdiag(mu.slice(ndarray::s![2, 2, ..]).mapv(|v| v.inv()).view());

    let axax = &neg(&(dxf * &ratio(eps, 2, 0))) + &neg(&(&ratio(mu, 1, 2) * dyf));
    let axay = &neg(&(dxf * &ratio(eps, 2, 1))) + &(&ratio(mu, 1, 2) * dxf);
    let axbx = &neg(&(&(dxf * &inv_eps_zz) * dyb)) + &reduced(mu, 1.0, 1, 0);
    let axby = &(&(dxf * &inv_eps_zz) * dxb) + &reduced(mu, 1.0, 1, 1);
    let ayax = &neg(&(dyf * &ratio(eps, 2, 0))) + &(&ratio(mu, 0, 2) * dyf);
    let ayay = &neg(&(dyf * &ratio(eps, 2, 1))) + &neg(&(&ratio(mu, 0, 2) * dxf));
    let aybx = &neg(&(&(dyf * &inv_eps_zz) * dyb)) + &reduced(mu, -1.0, 0, 0);
    let ayby = &(&(dyf * &inv_eps_zz) * dxb) + &reduced(mu, -1.0, 0, 1);
    let bxbx = &neg(&(dxb * &ratio(mu, 2, 0))) + &neg(&(&ratio(eps, 1, 2) * dyb));
    let bxby = &neg(&(dxb * &ratio(mu, 2, 1))) + &(&ratio(eps, 1, 2) * dxb);
    let bxax = &neg(&(&(dxb * &inv_mu_zz) * dyf)) + &reduced(eps, 1.0, 1, 0);
    let bxay = &(&(dxb * &inv_mu_zz) * dxf) + &reduced(eps, 1.0, 1, 1);
    let bybx = &neg(&(dyb * &ratio(mu, 2, 0))) + &(&ratio(eps, 0, 2) * dyb);
    let byby = &neg(&(dyb * &ratio(mu, 2, 1))) + &neg(&(&ratio(eps, 0, 2) * dxb));
    let byax = &neg(&(&(dyb * &inv_mu_zz) * dyf)) + &reduced(eps, -1.0, 0, 0);
    let byay = &(&(dyb * &inv_mu_zz) * dxf) + &reduced(eps, -1.0, 0, 1);

    sp_block(&[
        vec![&axax, &axay, &axbx, &axby],
        vec![&ayax, &ayay, &aybx, &ayby],
        vec![&bxax, &bxay, &bxbx, &bxby],
        vec![&byax, &byay, &bybx, &byby],
    ])
}
