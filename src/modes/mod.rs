// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The waveguide eigenmode solver.
//!
//! [`compute_modes`] takes a 2D permittivity cross-section on a (possibly
//! non-uniform) grid and returns the lowest-order eigenmodes of the
//! structure under translational invariance in the normal direction:
//! six-component fields plus the complex effective index of every mode.
//! Bent and tilted waveguides are mapped onto straight ones by coordinate
//! transformations that reshape ε and μ.

mod error;
pub(crate) mod derivatives;
pub(crate) mod operator;
mod spec;
pub(crate) mod transforms;

pub use error::ModeError;
pub use spec::{ModeSpec, SortBy, Symmetry};

use log::{debug, info};
use ndarray::{s, Array1, Array2, Array3, Array6, ArrayView2};
use sprs::CsMat;

use crate::{
    constants::{C_0, ETA_0, FP_EPS, PEC_VAL, TAU},
    linalg::{arnoldi::eigs_shift_invert, csr_mul_dense, LinalgError},
    c64,
};
use operator::{assemble_diagonal, assemble_tensorial, has_off_diagonal};
use transforms::{
    angled_transform, compose_jacobians, identity_jacobian, kp_to_k, radial_transform,
    transform_tensor,
};

/// The permittivity of a waveguide cross-section: a single scalar field, or
/// the three diagonal tensor components sampled at the Ex, Ey and Ez
/// positions of the Yee cell.
#[derive(Clone, Debug)]
pub enum EpsCross {
    Scalar(Array2<c64>),
    Diagonal {
        xx: Array2<c64>,
        yy: Array2<c64>,
        zz: Array2<c64>,
    },
}

/// Result of a mode solve. `fields` has shape
/// `(2, 3, Nx, Ny, 1, num_modes)` ordered `(E/H, component, x, y, z, mode)`;
/// `n_eff` holds the complex effective index per mode, with `Re` the
/// effective index and `Im` the extinction coefficient.
#[derive(Clone, Debug)]
pub struct ModeSolverResult {
    pub fields: Array6<c64>,
    pub n_eff: Array1<c64>,
}

/// Solve for the eigenmodes of a waveguide cross-section at `freq` \[Hz\].
///
/// `coords` are the primal grid boundaries of the two transverse axes, one
/// entry longer than the corresponding permittivity axis. `symmetry`
/// selects the boundary condition on the minimum-coordinate edges; the
/// maximum-coordinate edges are always PEC.
pub fn compute_modes(
    eps_cross: &EpsCross,
    coords: &[Array1<f64>; 2],
    freq: f64,
    mode_spec: &ModeSpec,
    symmetry: (Symmetry, Symmetry),
) -> Result<ModeSolverResult, ModeError> {
    mode_spec.validate()?;
    if !(freq > 0.0) || !freq.is_finite() {
        return Err(ModeError::InvalidModeSpec(format!(
            "frequency must be positive and finite, got {freq}"
        )));
    }

    let omega = TAU * freq;
    let k0 = omega / C_0;
    let num_modes = mode_spec.num_modes;

    let (eps_xx, eps_yy, eps_zz) = unpack_eps(eps_cross)?;
    let (nx, ny) = eps_xx.dim();
    let n = nx * ny;
    if coords[0].len() != nx + 1 || coords[1].len() != ny + 1 {
        return Err(ModeError::CoordsMismatch(
            nx + 1,
            ny + 1,
            coords[0].len(),
            coords[1].len(),
        ));
    }

    // Promote to the full-tensor representation; coordinate transforms can
    // populate off-diagonals. μ starts as vacuum.
    let mut eps_tensor = Array3::<c64>::zeros((3, 3, n));
    let mut mu_tensor = identity_jacobian(n);
    for j in 0..ny {
        for i in 0..nx {
            let p = j * nx + i;
            eps_tensor[(0, 0, p)] = eps_xx[(i, j)];
            eps_tensor[(1, 1, p)] = eps_yy[(i, j)];
            eps_tensor[(2, 2, p)] = eps_zz[(i, j)];
        }
    }

    // Stack the coordinate transforms into per-point Jacobians.
    let mut jac_e = identity_jacobian(n);
    let mut jac_h = identity_jacobian(n);
    if let Some(radius) = mode_spec.bend_radius {
        let (je, jh) = radial_transform(coords, radius, mode_spec.bend_axis, (nx, ny));
        jac_e = je;
        jac_h = jh;
    }
    if mode_spec.angle_theta > 0.0 {
        let (je, jh) = angled_transform(mode_spec.angle_theta, mode_spec.angle_phi, n);
        jac_e = compose_jacobians(&je, &jac_e);
        jac_h = compose_jacobians(&jh, &jac_h);
    }

    // The k-vector transforms separately from the derivative operators: the
    // eigenvalue of the transformed problem is rescaled back to a physical
    // effective index at the end.
    let kp = kp_to_k(mode_spec.angle_theta, mode_spec.angle_phi);
    let kp_norm = (kp[0] * kp[0] + kp[1] * kp[1] + kp[2] * kp[2]).sqrt();

    eps_tensor = transform_tensor(&jac_e, &eps_tensor);
    mu_tensor = transform_tensor(&jac_h, &mu_tensor);

    // The forward derivatives impose PEC on the maximum-coordinate edges.
    // The minimum-coordinate edges become PEC through the permittivity
    // unless a PMC symmetry plane sits there, which instead modifies the
    // backward derivative.
    let pec = c64::new(PEC_VAL, 0.0);
    let mut dmin_pmc = [false, false];
    if symmetry.0.is_pmc() {
        dmin_pmc[0] = true;
    } else {
        for j in 0..ny {
            eps_tensor[(1, 1, j * nx)] = pec;
            eps_tensor[(2, 2, j * nx)] = pec;
        }
    }
    if ny > 1 {
        if symmetry.1.is_pmc() {
            dmin_pmc[1] = true;
        } else {
            for i in 0..nx {
                eps_tensor[(0, 0, i)] = pec;
                eps_tensor[(2, 2, i)] = pec;
            }
        }
    }

    // Primal steps for E-field derivatives, dual steps for H-field ones.
    // The first dual step reuses the first primal step.
    let dl_f = [primal_steps(&coords[0]), primal_steps(&coords[1])];
    let dl_b = [dual_steps(&dl_f[0]), dual_steps(&dl_f[1])];

    let d_mats = derivatives::create_d_matrices((nx, ny), &dl_f, &dl_b, dmin_pmc);
    let dmin_pml = [
        symmetry.0.allows_near_pml(),
        symmetry.1.allows_near_pml(),
    ];
    let s_mats =
        derivatives::create_s_matrices(omega, (nx, ny), mode_spec.num_pml, &dl_f, dmin_pml);

    // Stretched derivatives, normalized by k0 so eigenvalues are unitless.
    let inv_k0 = c64::new(1.0 / k0, 0.0);
    let der_mats: [CsMat<c64>; 4] = [
        (&s_mats[0] * &d_mats[0]).map(|&v| v * inv_k0),
        (&s_mats[1] * &d_mats[1]).map(|&v| v * inv_k0),
        (&s_mats[2] * &d_mats[2]).map(|&v| v * inv_k0),
        (&s_mats[3] * &d_mats[3]).map(|&v| v * inv_k0),
    ];

    // Shift-invert target in transformed coordinates.
    let target = match mode_spec.target_neff {
        Some(t) => t,
        None => max_physical_index(eps_cross),
    };
    let target_p = target / kp_norm;

    debug!(
        "mode solve: {nx}x{ny} cells, {num_modes} mode(s), target n_eff {target:.4}"
    );

    let mut raw = solver_em(&eps_tensor, &mu_tensor, &der_mats, num_modes, target_p)
        .map_err(|e| match e {
            LinalgError::ArnoldiNoConvergence(_) | LinalgError::KrylovExhausted { .. } => {
                ModeError::NoEigenmodesFound {
                    target_neff: target,
                }
            }
            other => ModeError::Linalg(other),
        })?;
    if raw.neff.is_empty() {
        return Err(ModeError::NoEigenmodesFound {
            target_neff: target,
        });
    }

    // Reorder if a polarization-fraction sort was requested.
    if mode_spec.sort_by != SortBy::LargestNeff {
        let order = polarization_order(&raw, mode_spec.sort_by);
        raw = raw.reordered(&order);
    }

    // Back to physical axes: E = J_Eᵀ·E', H = J_Hᵀ·H'.
    let e_phys = back_transform(&jac_e, &raw.e);
    let h_phys = back_transform(&jac_h, &raw.h);

    let num_found = raw.neff.len();
    let mut fields = Array6::<c64>::zeros((2, 3, nx, ny, 1, num_found));
    for p in 0..3 {
        for j in 0..ny {
            for i in 0..nx {
                let idx = j * nx + i;
                for k in 0..num_found {
                    fields[[0, p, i, j, 0, k]] = e_phys[(p, idx, k)];
                    fields[[1, p, i, j, 0, k]] = h_phys[(p, idx, k)];
                }
            }
        }
    }

    let n_eff = Array1::from_iter(
        raw.neff
            .iter()
            .zip(raw.keff.iter())
            .map(|(&nr, &ni)| c64::new(nr * kp_norm, ni)),
    );
    info!(
        "mode solve finished; n_eff = {:?}",
        n_eff.iter().map(|v| v.re).collect::<Vec<_>>()
    );

    Ok(ModeSolverResult { fields, n_eff })
}

/// Eigenmodes in solver coordinates, fields shaped `(3, N, M)`.
struct RawModes {
    e: Array3<c64>,
    h: Array3<c64>,
    neff: Array1<f64>,
    keff: Array1<f64>,
}

impl RawModes {
    fn reordered(&self, order: &[usize]) -> RawModes {
        let pick3 = |a: &Array3<c64>| -> Array3<c64> {
            let (c, n, _) = a.dim();
            let mut out = Array3::zeros((c, n, order.len()));
            for (new, &old) in order.iter().enumerate() {
                out.slice_mut(s![.., .., new]).assign(&a.slice(s![.., .., old]));
            }
            out
        };
        RawModes {
            e: pick3(&self.e),
            h: pick3(&self.h),
            neff: Array1::from_iter(order.iter().map(|&k| self.neff[k])),
            keff: Array1::from_iter(order.iter().map(|&k| self.keff[k])),
        }
    }
}

/// Dispatch on the material tensors: diagonal ones admit the smaller
/// 2N×2N eigenproblem.
fn solver_em(
    eps: &Array3<c64>,
    mu: &Array3<c64>,
    der_mats: &[CsMat<c64>; 4],
    num_modes: usize,
    neff_guess: f64,
) -> Result<RawModes, LinalgError> {
    if has_off_diagonal(eps) || has_off_diagonal(mu) {
        debug!("off-diagonal ε/μ present; using the tensorial operator");
        solver_tensorial(eps, mu, der_mats, num_modes, neff_guess)
    } else {
        solver_diagonal(eps, mu, der_mats, num_modes, neff_guess)
    }
}

/// Eigenmode solve with diagonal ε and μ.
fn solver_diagonal(
    eps: &Array3<c64>,
    mu: &Array3<c64>,
    der_mats: &[CsMat<c64>; 4],
    num_modes: usize,
    neff_guess: f64,
) -> Result<RawModes, LinalgError> {
    let n = eps.dim().2;
    let op = assemble_diagonal(eps, mu, der_mats);

    // Eigenvalues are −(n_eff + i·k_eff)².
    let sigma = c64::new(-(neff_guess * neff_guess), 0.0);
    let (vals, vecs) = eigs_shift_invert(&op.mat, num_modes, sigma, FP_EPS)?;
    let num_found = vals.len();

    let vre: Vec<f64> = vals.iter().map(|v| -v.re).collect();
    let vim: Vec<f64> = vals.iter().map(|v| -v.im).collect();
    let order = descending_order(&vre);

    let mut neff = Array1::zeros(num_found);
    let mut keff = Array1::zeros(num_found);
    let mut e_t = Array2::<c64>::zeros((2 * n, num_found));
    for (new, &old) in order.iter().enumerate() {
        let (re, im) = (vre[old], vim[old]);
        let nr = (re / 2.0 + (re * re + im * im).sqrt() / 2.0).sqrt();
        neff[new] = nr;
        // Guarded against division by zero for fully evanescent modes.
        keff[new] = im / (2.0 * (nr + 1e-10));
        if nr < 1e-8 {
            debug!("mode {new} is evanescent (n_eff ~ {nr:.2e})");
        }
        e_t.column_mut(new).assign(&vecs.column(old));
    }

    // Transverse H from Q, longitudinal components from the constitutive
    // relations.
    let mut h_t = csr_mul_dense(&op.qmat, e_t.view());
    for k in 0..num_found {
        let denom = c64::new(-keff[k], neff[k]);
        h_t.column_mut(k).mapv_inplace(|v| v / denom);
    }

    let e_x = e_t.slice(s![0..n, ..]);
    let e_y = e_t.slice(s![n..2 * n, ..]);
    let h_x = h_t.slice(s![0..n, ..]);
    let h_y = h_t.slice(s![n..2 * n, ..]);

    let [dxf, dxb, dyf, dyb] = der_mats;
    let mut h_z = &csr_mul_dense(dxf, e_y) - &csr_mul_dense(dyf, e_x);
    scale_rows_by_inverse(&mut h_z, mu, 2);
    let mut e_z = &csr_mul_dense(dxb, h_y) - &csr_mul_dense(dyb, h_x);
    scale_rows_by_inverse(&mut e_z, eps, 2);

    Ok(bundle_fields(e_x, e_y, e_z.view(), h_x, h_y, h_z.view(), neff, keff))
}

/// Eigenmode solve with tensorial ε or μ.
fn solver_tensorial(
    eps: &Array3<c64>,
    mu: &Array3<c64>,
    der_mats: &[CsMat<c64>; 4],
    num_modes: usize,
    neff_guess: f64,
) -> Result<RawModes, LinalgError> {
    let n = eps.dim().2;
    let mat = assemble_tensorial(eps, mu, der_mats);

    // Eigenvalues are i·(n_eff + i·k_eff).
    let sigma = c64::new(0.0, neff_guess);
    let (vals, vecs) = eigs_shift_invert(&mat, num_modes, sigma, FP_EPS)?;
    let num_found = vals.len();

    let nre: Vec<f64> = vals.iter().map(|v| v.im).collect();
    let nim: Vec<f64> = vals.iter().map(|v| -v.re).collect();
    let order = descending_order(&nre);

    let mut neff = Array1::zeros(num_found);
    let mut keff = Array1::zeros(num_found);
    let mut vecs_sorted = Array2::<c64>::zeros((4 * n, num_found));
    for (new, &old) in order.iter().enumerate() {
        neff[new] = nre[old];
        keff[new] = nim[old];
        vecs_sorted.column_mut(new).assign(&vecs.column(old));
    }

    let e_x = vecs_sorted.slice(s![0..n, ..]);
    let e_y = vecs_sorted.slice(s![n..2 * n, ..]);
    let h_x = vecs_sorted.slice(s![2 * n..3 * n, ..]);
    let h_y = vecs_sorted.slice(s![3 * n..4 * n, ..]);

    let [dxf, dxb, dyf, dyb] = der_mats;

    // Longitudinal fields pick up the off-diagonal material couplings.
    let mut h_z = &csr_mul_dense(dxf, e_y) - &csr_mul_dense(dyf, e_x);
    for p in 0..n {
        for k in 0..num_found {
            h_z[(p, k)] -= mu[(2, 0, p)] * h_x[(p, k)] + mu[(2, 1, p)] * h_y[(p, k)];
        }
    }
    scale_rows_by_inverse(&mut h_z, mu, 2);

    let mut e_z = &csr_mul_dense(dxb, h_y) - &csr_mul_dense(dyb, h_x);
    for p in 0..n {
        for k in 0..num_found {
            e_z[(p, k)] -= eps[(2, 0, p)] * e_x[(p, k)] + eps[(2, 1, p)] * e_y[(p, k)];
        }
    }
    scale_rows_by_inverse(&mut e_z, eps, 2);

    Ok(bundle_fields(e_x, e_y, e_z.view(), h_x, h_y, h_z.view(), neff, keff))
}

/// Stack the six components and rescale H from the solver's internal
/// normalization to SI units.
#[allow(clippy::too_many_arguments)]
fn bundle_fields(
    e_x: ArrayView2<c64>,
    e_y: ArrayView2<c64>,
    e_z: ArrayView2<c64>,
    h_x: ArrayView2<c64>,
    h_y: ArrayView2<c64>,
    h_z: ArrayView2<c64>,
    neff: Array1<f64>,
    keff: Array1<f64>,
) -> RawModes {
    let (n, m) = e_x.dim();
    let mut e = Array3::<c64>::zeros((3, n, m));
    let mut h = Array3::<c64>::zeros((3, n, m));
    e.slice_mut(s![0, .., ..]).assign(&e_x);
    e.slice_mut(s![1, .., ..]).assign(&e_y);
    e.slice_mut(s![2, .., ..]).assign(&e_z);
    h.slice_mut(s![0, .., ..]).assign(&h_x);
    h.slice_mut(s![1, .., ..]).assign(&h_y);
    h.slice_mut(s![2, .., ..]).assign(&h_z);
    // H carries a factor of i·η₀ inside the solver.
    let h_scale = c64::new(0.0, -1.0 / ETA_0);
    h.mapv_inplace(|v| v * h_scale);
    RawModes { e, h, neff, keff }
}

/// Divide every row of `mat` by the `(d, d)` tensor entry of its point.
fn scale_rows_by_inverse(mat: &mut Array2<c64>, tensor: &Array3<c64>, d: usize) {
    for (p, mut row) in mat.outer_iter_mut().enumerate() {
        let inv = tensor[(d, d, p)].inv();
        row.mapv_inplace(|v| v * inv);
    }
}

fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Mode order by descending TE (or TM) fraction of the in-plane E field.
fn polarization_order(raw: &RawModes, sort_by: SortBy) -> Vec<usize> {
    let (_, n, m) = raw.e.dim();
    let component = match sort_by {
        SortBy::TeFraction => 0,
        SortBy::TmFraction => 1,
        SortBy::LargestNeff => unreachable!(),
    };
    let fractions: Vec<f64> = (0..m)
        .map(|k| {
            let mut num = 0.0;
            let mut den = 0.0;
            for p in 0..n {
                let ex = raw.e[(0, p, k)].norm_sqr();
                let ey = raw.e[(1, p, k)].norm_sqr();
                num += if component == 0 { ex } else { ey };
                den += ex + ey;
            }
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        })
        .collect();
    descending_order(&fractions)
}

/// `E_phys[p] = Σ_i J[i, p]·E_solver[i]`, per point and mode.
fn back_transform(jac: &Array3<c64>, fields: &Array3<c64>) -> Array3<c64> {
    let (_, n, m) = fields.dim();
    let mut out = Array3::<c64>::zeros((3, n, m));
    for p in 0..3 {
        for i in 0..3 {
            for idx in 0..n {
                let j = jac[(i, p, idx)];
                if j == c64::new(0.0, 0.0) {
                    continue;
                }
                for k in 0..m {
                    out[(p, idx, k)] += j * fields[(i, idx, k)];
                }
            }
        }
    }
    out
}

fn unpack_eps(eps_cross: &EpsCross) -> Result<(Array2<c64>, Array2<c64>, Array2<c64>), ModeError> {
    match eps_cross {
        EpsCross::Scalar(eps) => Ok((eps.clone(), eps.clone(), eps.clone())),
        EpsCross::Diagonal { xx, yy, zz } => {
            for (component, arr) in [("yy", yy), ("zz", zz)] {
                if arr.dim() != xx.dim() {
                    return Err(ModeError::InvalidPermittivityShape {
                        component,
                        expected: xx.dim(),
                        got: arr.dim(),
                    });
                }
            }
            Ok((xx.clone(), yy.clone(), zz.clone()))
        }
    }
}

/// The largest refractive index among non-PEC cells; the default
/// shift-invert target.
fn max_physical_index(eps_cross: &EpsCross) -> f64 {
    let arrays: Vec<&Array2<c64>> = match eps_cross {
        EpsCross::Scalar(eps) => vec![eps],
        EpsCross::Diagonal { xx, yy, zz } => vec![xx, yy, zz],
    };
    let mut max_eps: f64 = 0.0;
    for arr in arrays {
        for v in arr.iter() {
            let mag = v.norm();
            if mag < PEC_VAL.abs() {
                max_eps = max_eps.max(mag);
            }
        }
    }
    if max_eps > 0.0 {
        max_eps.sqrt()
    } else {
        1.0
    }
}

fn primal_steps(coords: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(coords.windows(2).into_iter().map(|w| w[1] - w[0]))
}

fn dual_steps(dl_f: &Array1<f64>) -> Array1<f64> {
    let n = dl_f.len();
    let mut out = Array1::zeros(n);
    out[0] = dl_f[0];
    for i in 1..n {
        out[i] = (dl_f[i - 1] + dl_f[i]) / 2.0;
    }
    out
}
