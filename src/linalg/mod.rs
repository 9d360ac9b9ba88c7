// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sparse complex linear algebra for the shift-invert eigensolver.
//!
//! The mode solver needs "the `num_modes` eigenpairs of a large sparse
//! complex matrix nearest a target". This module provides that behind one
//! narrow function, [`arnoldi::eigs_shift_invert`], built from a sparse LU
//! factorization ([`lu`]) and a dense Hessenberg Schur decomposition
//! ([`schur`]).

pub(crate) mod arnoldi;
pub(crate) mod lu;
pub(crate) mod schur;

use ndarray::{Array2, ArrayView2};
use sprs::CsMat;
use thiserror::Error;

use crate::c64;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error(
        "the shifted operator is numerically singular; \
         the shift coincides with an eigenvalue"
    )]
    SingularShift,

    #[error("the QR iteration did not converge after {0} sweeps")]
    QrNoConvergence(usize),

    #[error(
        "the Krylov subspace (dimension {subspace}) cannot hold the {requested} \
         requested eigenpairs"
    )]
    KrylovExhausted { requested: usize, subspace: usize },

    #[error("the Arnoldi iteration did not converge after {0} restarts")]
    ArnoldiNoConvergence(usize),
}

/// Multiply a sparse CSR matrix with a dense matrix, `out = mat · rhs`.
pub(crate) fn csr_mul_dense(mat: &CsMat<c64>, rhs: ArrayView2<c64>) -> Array2<c64> {
    assert!(mat.is_csr());
    assert_eq!(mat.cols(), rhs.nrows());
    let mut out = Array2::zeros((mat.rows(), rhs.ncols()));
    for (row, row_vec) in mat.outer_iterator().enumerate() {
        for (col, &val) in row_vec.iter() {
            for k in 0..rhs.ncols() {
                out[(row, k)] += val * rhs[(col, k)];
            }
        }
    }
    out
}
