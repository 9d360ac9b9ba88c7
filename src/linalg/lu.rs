// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sparse LU factorization of complex matrices.
//!
//! Left-looking (Gilbert–Peierls) factorization with partial pivoting: each
//! column is obtained from a sparse triangular solve whose nonzero pattern
//! is the graph reach of the column's pattern through the already-computed
//! part of `L`. No fill-reducing column ordering is applied; the operators
//! factored here are narrow-band 2D stencils where natural order is
//! acceptable.

use ndarray::{Array1, ArrayView1};
use num_traits::Zero;
use sprs::CsMat;

use super::LinalgError;
use crate::c64;

/// `P·A = L·U` with unit-diagonal `L`. Row indices inside the factors are
/// in permuted (pivotal) order.
pub(crate) struct SparseLu {
    n: usize,
    /// Columns of `L`, entries `(row, value)` with `row > col`.
    l_cols: Vec<Vec<(usize, c64)>>,
    /// Off-diagonal columns of `U`, entries `(row, value)` with `row < col`.
    u_cols: Vec<Vec<(usize, c64)>>,
    u_diag: Vec<c64>,
    /// `perm[k]` is the original row pivoted into position `k`.
    perm: Vec<usize>,
}

impl SparseLu {
    pub(crate) fn factorize(mat: &CsMat<c64>) -> Result<SparseLu, LinalgError> {
        let n = mat.rows();
        assert_eq!(n, mat.cols(), "LU factorization needs a square matrix");

        // Work on columns.
        let csc = if mat.is_csc() {
            mat.clone()
        } else {
            mat.to_other_storage()
        };
        let a_cols: Vec<Vec<(usize, c64)>> = csc
            .outer_iterator()
            .map(|col| col.iter().map(|(row, &val)| (row, val)).collect())
            .collect();

        let mut l_cols: Vec<Vec<(usize, c64)>> = Vec::with_capacity(n);
        let mut u_cols: Vec<Vec<(usize, c64)>> = Vec::with_capacity(n);
        let mut u_diag: Vec<c64> = Vec::with_capacity(n);
        let mut perm = vec![0usize; n];
        // pinv[row] is the pivotal position of `row`, or usize::MAX while the
        // row is still unpivoted.
        let mut pinv = vec![usize::MAX; n];

        // Dense workspace indexed by original row, plus DFS state.
        let mut x = vec![c64::zero(); n];
        let mut marked = vec![false; n];
        let mut topo: Vec<usize> = Vec::with_capacity(n);
        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(n);

        for j in 0..n {
            // Symbolic step: the reach of this column's pattern through L,
            // in postorder. Reversed, it is a valid elimination order.
            topo.clear();
            for &(row, _) in &a_cols[j] {
                if marked[row] {
                    continue;
                }
                marked[row] = true;
                stack.push((row, 0));
                while let Some(&(node, child)) = stack.last() {
                    let deps: &[(usize, c64)] = if pinv[node] != usize::MAX {
                        &l_cols[pinv[node]]
                    } else {
                        &[]
                    };
                    if child < deps.len() {
                        stack.last_mut().unwrap().1 += 1;
                        let next = deps[child].0;
                        if !marked[next] {
                            marked[next] = true;
                            stack.push((next, 0));
                        }
                    } else {
                        stack.pop();
                        topo.push(node);
                    }
                }
            }

            // Numeric step: sparse triangular solve L·x = A[:,j].
            for &(row, val) in &a_cols[j] {
                x[row] = val;
            }
            for &node in topo.iter().rev() {
                let k = pinv[node];
                if k == usize::MAX {
                    continue;
                }
                let xk = x[node];
                if xk.is_zero() {
                    continue;
                }
                for &(row, lval) in &l_cols[k] {
                    x[row] -= lval * xk;
                }
            }

            // Partial pivoting over the unpivoted rows.
            let mut pivot_row = usize::MAX;
            let mut pivot_mag = 0.0;
            for &row in &topo {
                if pinv[row] == usize::MAX {
                    let mag = x[row].norm_sqr();
                    if mag > pivot_mag {
                        pivot_mag = mag;
                        pivot_row = row;
                    }
                }
            }
            if pivot_row == usize::MAX || pivot_mag == 0.0 {
                return Err(LinalgError::SingularShift);
            }
            let pivot = x[pivot_row];

            let mut ucol = Vec::new();
            let mut lcol = Vec::new();
            for &row in &topo {
                let k = pinv[row];
                if k != usize::MAX {
                    if !x[row].is_zero() {
                        ucol.push((k, x[row]));
                    }
                } else if row != pivot_row && !x[row].is_zero() {
                    lcol.push((row, x[row] / pivot));
                }
            }
            u_cols.push(ucol);
            l_cols.push(lcol);
            u_diag.push(pivot);
            pinv[pivot_row] = j;
            perm[j] = pivot_row;

            // Reset the workspace.
            for &row in &topo {
                x[row] = c64::zero();
                marked[row] = false;
            }
        }

        // Map the row indices of L into pivotal order; every row has been
        // pivoted by now.
        for col in &mut l_cols {
            for entry in col.iter_mut() {
                entry.0 = pinv[entry.0];
            }
        }

        Ok(SparseLu {
            n,
            l_cols,
            u_cols,
            u_diag,
            perm,
        })
    }

    /// Solve `A·x = b`.
    pub(crate) fn solve(&self, b: ArrayView1<c64>) -> Array1<c64> {
        assert_eq!(b.len(), self.n);
        // Forward: L·z = P·b.
        let mut z: Vec<c64> = self.perm.iter().map(|&row| b[row]).collect();
        for k in 0..self.n {
            let zk = z[k];
            if zk.is_zero() {
                continue;
            }
            for &(row, lval) in &self.l_cols[k] {
                z[row] -= lval * zk;
            }
        }
        // Backward: U·x = z, with column-stored U.
        for k in (0..self.n).rev() {
            z[k] /= self.u_diag[k];
            let xk = z[k];
            if xk.is_zero() {
                continue;
            }
            for &(row, uval) in &self.u_cols[k] {
                z[row] -= uval * xk;
            }
        }
        Array1::from(z)
    }
}
