// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinate transformations that restore translational invariance.
//!
//! A bent waveguide is not translationally invariant in Cartesian
//! coordinates, but becomes so after substituting the arc length `w = R·φ`
//! for the propagation coordinate. A waveguide whose propagation axis is
//! tilted against the plane normal is handled by shearing the propagation
//! coordinate onto the tilted axis. Both transformations enter Maxwell's
//! equations only through per-point Jacobians that reshape ε and μ.

use ndarray::{Array1, Array3};

use crate::c64;

/// Jacobians for the bend substitution `w = R·φ`. The metric factor
/// `1/(1 + u/R)` acts on the propagation component, with `u` the in-plane
/// coordinate orthogonal to the bend axis. E components are sampled on the
/// primal grid, H components on the dual grid.
pub(crate) fn radial_transform(
    coords: &[Array1<f64>; 2],
    radius: f64,
    bend_axis: usize,
    shape: (usize, usize),
) -> (Array3<c64>, Array3<c64>) {
    let (nx, ny) = shape;
    let n = nx * ny;
    let u_axis = 1 - bend_axis;
    let u_coords = &coords[u_axis];

    let primal = |c: usize| u_coords[c];
    let dual = |c: usize| (u_coords[c] + u_coords[c + 1]) / 2.0;

    let mut jac_e = identity_jacobian(n);
    let mut jac_h = identity_jacobian(n);
    for j in 0..ny {
        for i in 0..nx {
            let p = j * nx + i;
            let c = if u_axis == 0 { i } else { j };
            jac_e[(2, 2, p)] = c64::new(1.0 / (1.0 + primal(c) / radius), 0.0);
            jac_h[(2, 2, p)] = c64::new(1.0 / (1.0 + dual(c) / radius), 0.0);
        }
    }
    (jac_e, jac_h)
}

/// Jacobian of the shear that aligns the propagation coordinate with an
/// axis tilted by `(θ, φ)`. The same dense 3×3 matrix applies at every grid
/// point and to both field species.
pub(crate) fn angled_transform(
    angle_theta: f64,
    angle_phi: f64,
    n: usize,
) -> (Array3<c64>, Array3<c64>) {
    let tan_theta = angle_theta.tan();
    let cos_theta = angle_theta.cos();

    let mut jac = identity_jacobian(n);
    for p in 0..n {
        jac[(0, 2, p)] = c64::new(-tan_theta * angle_phi.sin(), 0.0);
        jac[(1, 2, p)] = c64::new(-tan_theta * angle_phi.cos(), 0.0);
        jac[(2, 2, p)] = c64::new(1.0 / cos_theta, 0.0);
    }
    (jac.clone(), jac)
}

/// The factor relating the eigenvalue of the transformed problem to the
/// physical k-vector: the mode field `E'·exp(i·k_p·w)` in sheared
/// coordinates equals `E·exp(i·k·r)` in Cartesian ones.
pub(crate) fn kp_to_k(angle_theta: f64, angle_phi: f64) -> [f64; 3] {
    let kxy = angle_theta.cos().powi(2);
    let kz = angle_theta.cos() * angle_theta.sin();
    [kxy * angle_phi.sin(), kxy * angle_phi.cos(), kz]
}

pub(crate) fn identity_jacobian(n: usize) -> Array3<c64> {
    let mut jac = Array3::zeros((3, 3, n));
    for d in 0..3 {
        for p in 0..n {
            jac[(d, d, p)] = c64::new(1.0, 0.0);
        }
    }
    jac
}

/// Per-point composition `J_new = J_a · J_b`.
pub(crate) fn compose_jacobians(a: &Array3<c64>, b: &Array3<c64>) -> Array3<c64> {
    let n = a.dim().2;
    let mut out = Array3::zeros((3, 3, n));
    for i in 0..3 {
        for k in 0..3 {
            for j in 0..3 {
                for p in 0..n {
                    out[(i, k, p)] += a[(i, j, p)] * b[(j, k, p)];
                }
            }
        }
    }
    out
}

/// Transform a material tensor: `T' = (J · T · Jᵀ) / det J`, per point.
pub(crate) fn transform_tensor(jac: &Array3<c64>, tensor: &Array3<c64>) -> Array3<c64> {
    let n = tensor.dim().2;
    let mut out = Array3::zeros((3, 3, n));
    for p in 0..n {
        let j = |r: usize, c: usize| jac[(r, c, p)];
        let det = j(0, 0) * (j(1, 1) * j(2, 2) - j(1, 2) * j(2, 1))
            - j(0, 1) * (j(1, 0) * j(2, 2) - j(1, 2) * j(2, 0))
            + j(0, 2) * (j(1, 0) * j(2, 1) - j(1, 1) * j(2, 0));
        for r in 0..3 {
            for c in 0..3 {
                let mut acc = c64::new(0.0, 0.0);
                for a in 0..3 {
                    for b in 0..3 {
                        acc += j(r, a) * tensor[(a, b, p)] * j(c, b);
                    }
                }
                out[(r, c, p)] = acc / det;
            }
        }
    }
    out
}
