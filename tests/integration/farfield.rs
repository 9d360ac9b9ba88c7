// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Far-field projection scenarios: an x-oriented Hertzian dipole enclosed
//! by a six-face box of field monitors, checked against the closed-form
//! dipole pattern.

use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array4};
use wavefarer::{
    constants::{C_0, ETA_0, TAU},
    c64, Direction, FieldData, FieldMonitor, Grid, Medium, Near2Far, Near2FarError,
    Near2FarSurface, RadiationVectors, ScalarFieldArray, Simulation, SimulationData,
};

const WAVELENGTH: f64 = 1.0;
const BOX_HALF: f64 = 1.0;
/// Samples per face axis for the synthetic near fields.
const FACE_SAMPLES: usize = 81;

fn freq() -> f64 {
    C_0 / WAVELENGTH
}

fn wave_number() -> f64 {
    TAU / WAVELENGTH
}

/// Exact fields of an x̂-oriented Hertzian dipole (Il = 1) at the origin,
/// e^{+jωt} convention, radiating e^{−jkr}. Vector forms avoid the
/// coordinate singularities on the dipole axis.
fn dipole_fields(pos: [f64; 3], k: f64) -> ([c64; 3], [c64; 3]) {
    let r = (pos[0] * pos[0] + pos[1] * pos[1] + pos[2] * pos[2]).sqrt();
    let r_hat = [pos[0] / r, pos[1] / r, pos[2] / r];
    let p_hat = [1.0, 0.0, 0.0];
    let cos_big_theta = r_hat[0];

    let jkr = c64::new(0.0, k * r);
    let phase = (-jkr).exp();
    let j = c64::i();

    // Transverse and radial vector parts: p̂ − (r̂·p̂)r̂ and (r̂·p̂)r̂.
    let transverse = [
        p_hat[0] - cos_big_theta * r_hat[0],
        p_hat[1] - cos_big_theta * r_hat[1],
        p_hat[2] - cos_big_theta * r_hat[2],
    ];

    // E = η/(4π)·e^{−jkr}·[ −jk/r·(1 + 1/(jkr) − 1/(kr)²)·t̂ + 2/r²·(1 + 1/(jkr))·(r̂·p̂)·r̂ ]
    let near1 = c64::new(1.0, 0.0) + jkr.inv() - c64::new(1.0 / (k * r * k * r), 0.0);
    let near2 = c64::new(1.0, 0.0) + jkr.inv();
    let e_transverse = -j * k / r * near1 * phase * ETA_0 / (4.0 * std::f64::consts::PI);
    let e_radial =
        2.0 / (r * r) * near2 * phase * ETA_0 / (4.0 * std::f64::consts::PI) * cos_big_theta;
    let mut e = [c64::new(0.0, 0.0); 3];
    for a in 0..3 {
        e[a] = e_transverse * transverse[a] + e_radial * r_hat[a];
    }

    // H = jk/(4π)·e^{−jkr}·(1 + 1/(jkr))·(p̂×r̂)/r.
    let p_cross_r = [
        p_hat[1] * r_hat[2] - p_hat[2] * r_hat[1],
        p_hat[2] * r_hat[0] - p_hat[0] * r_hat[2],
        p_hat[0] * r_hat[1] - p_hat[1] * r_hat[0],
    ];
    let h_scale = j * k / (4.0 * std::f64::consts::PI * r) * near2 * phase;
    let mut h = [c64::new(0.0, 0.0); 3];
    for a in 0..3 {
        h[a] = h_scale * p_cross_r[a];
    }
    (e, h)
}

/// Sample the dipole fields on one face of the box and package them as a
/// planar monitor's field data.
fn face_data(axis: usize, side: f64, scale: c64) -> (FieldMonitor, FieldData) {
    let mut coords: [Array1<f64>; 3] = [
        Array1::linspace(-BOX_HALF, BOX_HALF, FACE_SAMPLES),
        Array1::linspace(-BOX_HALF, BOX_HALF, FACE_SAMPLES),
        Array1::linspace(-BOX_HALF, BOX_HALF, FACE_SAMPLES),
    ];
    coords[axis] = Array1::from(vec![side * BOX_HALF]);
    let dims = (coords[0].len(), coords[1].len(), coords[2].len(), 1);

    let k = wave_number();
    let mut e_arrays = [
        Array4::zeros(dims),
        Array4::zeros(dims),
        Array4::zeros(dims),
    ];
    let mut h_arrays = e_arrays.clone();
    for (ix, &x) in coords[0].iter().enumerate() {
        for (iy, &y) in coords[1].iter().enumerate() {
            for (iz, &z) in coords[2].iter().enumerate() {
                let (e, h) = dipole_fields([x, y, z], k);
                for a in 0..3 {
                    e_arrays[a][(ix, iy, iz, 0)] = e[a] * scale;
                    h_arrays[a][(ix, iy, iz, 0)] = h[a] * scale;
                }
            }
        }
    }

    let make = |values: Array4<c64>| {
        Some(ScalarFieldArray::new(
            coords.clone(),
            vec![freq()],
            values,
        ))
    };
    let [e0, e1, e2] = e_arrays;
    let [h0, h1, h2] = h_arrays;
    let field_data = FieldData {
        e: [make(e0), make(e1), make(e2)],
        h: [make(h0), make(h1), make(h2)],
    };

    let mut size = [2.0 * BOX_HALF; 3];
    size[axis] = 0.0;
    let mut center = [0.0; 3];
    center[axis] = side * BOX_HALF;
    let name = format!("face_{axis}_{}", if side > 0.0 { "plus" } else { "minus" });
    (FieldMonitor::new(&name, center, size, vec![freq()]), field_data)
}

/// The dipole box: six monitors with outward normals, exact fields.
fn dipole_box(scale: c64) -> (SimulationData, Vec<Near2FarSurface>) {
    let mut monitor_data = HashMap::new();
    let mut surfaces = Vec::new();
    for axis in 0..3 {
        for (side, dir) in [(1.0, Direction::Plus), (-1.0, Direction::Minus)] {
            let (monitor, data) = face_data(axis, side, scale);
            monitor_data.insert(monitor.name.clone(), data);
            surfaces.push(Near2FarSurface::new(monitor, dir).unwrap());
        }
    }
    let sim_data = SimulationData {
        simulation: Simulation {
            center: [0.0; 3],
            size: [2.0 * BOX_HALF; 3],
            medium: Medium::default(),
            grid: Grid::uniform([0.0; 3], [2.0 * BOX_HALF; 3], [20, 20, 20]),
        },
        monitor_data,
    };
    (sim_data, surfaces)
}

fn angles() -> (Vec<f64>, Vec<f64>) {
    let theta: Vec<f64> = (0..13)
        .map(|i| 0.15 + (std::f64::consts::PI - 0.3) * i as f64 / 12.0)
        .collect();
    let phi: Vec<f64> = (0..16).map(|i| TAU * i as f64 / 16.0).collect();
    (theta, phi)
}

/// `|L_φ + η·N_θ|² + |L_θ − η·N_φ|²`, proportional to the radiated power
/// pattern, flattened over the angle grid.
fn power_pattern(rv: &RadiationVectors) -> Vec<f64> {
    let mut pattern = Vec::new();
    for i in 0..rv.theta.len() {
        for j in 0..rv.phi.len() {
            let e_th = rv.l_phi[(i, j, 0)] + rv.n_theta[(i, j, 0)] * ETA_0;
            let e_ph = rv.l_theta[(i, j, 0)] - rv.n_phi[(i, j, 0)] * ETA_0;
            pattern.push(e_th.norm_sqr() + e_ph.norm_sqr());
        }
    }
    pattern
}

fn normalized(v: &[f64]) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[test]
fn dipole_pattern_matches_the_closed_form() {
    let (sim_data, surfaces) = dipole_box(c64::new(1.0, 0.0));
    let n2f = Near2Far::from_surfaces(sim_data, surfaces, true, 10, None, None).unwrap();
    let (theta, phi) = angles();
    let rv = n2f.radiation_vectors(&theta, &phi).unwrap();

    let computed = normalized(&power_pattern(&rv));
    let analytic: Vec<f64> = theta
        .iter()
        .flat_map(|&th| {
            phi.iter()
                .map(|&ph| 1.0 - (th.sin() * ph.cos()).powi(2))
                .collect::<Vec<_>>()
        })
        .collect();
    let analytic = normalized(&analytic);

    let err = l2_distance(&computed, &analytic);
    assert!(err < 0.02, "pattern L2 error {err:.4}");
}

#[test]
fn yee_centers_and_resampled_integration_agree() {
    let (sim_data, surfaces) = dipole_box(c64::new(1.0, 0.0));
    let (theta, phi) = angles();

    let resampled = Near2Far::from_surfaces(
        sim_data.clone(),
        surfaces.clone(),
        true,
        10,
        None,
        None,
    )
    .unwrap()
    .radiation_vectors(&theta, &phi)
    .unwrap();
    let centers = Near2Far::from_surfaces(sim_data, surfaces, false, 10, None, None)
        .unwrap()
        .radiation_vectors(&theta, &phi)
        .unwrap();

    let a = normalized(&power_pattern(&resampled));
    let b = normalized(&power_pattern(&centers));
    let err = l2_distance(&a, &b);
    assert!(err < 0.02, "resampled vs centers L2 distance {err:.4}");
}

#[test]
fn radiation_vectors_are_linear_in_the_fields() {
    let alpha = c64::new(2.5, -0.75);
    let (sim_data, surfaces) = dipole_box(c64::new(1.0, 0.0));
    let (sim_scaled, surf_scaled) = dipole_box(alpha);
    let (theta, phi) = angles();

    let base = Near2Far::from_surfaces(sim_data, surfaces, true, 10, None, None)
        .unwrap()
        .radiation_vectors(&theta, &phi)
        .unwrap();
    let scaled = Near2Far::from_surfaces(sim_scaled, surf_scaled, true, 10, None, None)
        .unwrap()
        .radiation_vectors(&theta, &phi)
        .unwrap();

    for i in [0, 5, 12] {
        for j in [0, 7, 15] {
            let want = base.n_theta[(i, j, 0)] * alpha;
            let got = scaled.n_theta[(i, j, 0)];
            assert_abs_diff_eq!(got.re, want.re, epsilon = 1e-10 * want.norm().max(1.0));
            assert_abs_diff_eq!(got.im, want.im, epsilon = 1e-10 * want.norm().max(1.0));
            let want = base.l_phi[(i, j, 0)] * alpha;
            let got = scaled.l_phi[(i, j, 0)];
            assert_abs_diff_eq!(got.re, want.re, epsilon = 1e-10 * want.norm().max(1.0));
            assert_abs_diff_eq!(got.im, want.im, epsilon = 1e-10 * want.norm().max(1.0));
        }
    }
}

#[test]
fn shifting_the_origin_is_a_pure_phase() {
    let delta = [0.2, -0.1, 0.15];
    let (sim_data, surfaces) = dipole_box(c64::new(1.0, 0.0));
    let (theta, phi) = angles();

    let base = Near2Far::from_surfaces(
        sim_data.clone(),
        surfaces.clone(),
        true,
        10,
        None,
        Some([0.0; 3]),
    )
    .unwrap()
    .radiation_vectors(&theta, &phi)
    .unwrap();
    let shifted = Near2Far::from_surfaces(sim_data, surfaces, true, 10, None, Some(delta))
        .unwrap()
        .radiation_vectors(&theta, &phi)
        .unwrap();

    let k = wave_number();
    let scale = base
        .n_theta
        .iter()
        .map(|v| v.norm())
        .fold(0.0, f64::max);
    for (i, &th) in theta.iter().enumerate() {
        for (j, &ph) in phi.iter().enumerate() {
            let k_hat = [th.sin() * ph.cos(), th.sin() * ph.sin(), th.cos()];
            let arg = k * (k_hat[0] * delta[0] + k_hat[1] * delta[1] + k_hat[2] * delta[2]);
            let phase = c64::new(0.0, arg).exp();
            let want = base.n_theta[(i, j, 0)] * phase;
            let got = shifted.n_theta[(i, j, 0)];
            assert_abs_diff_eq!(got.re, want.re, epsilon = 1e-9 * scale);
            assert_abs_diff_eq!(got.im, want.im, epsilon = 1e-9 * scale);
        }
    }
}

#[test]
fn refining_the_quadrature_shrinks_the_error() {
    let (sim_data, surfaces) = dipole_box(c64::new(1.0, 0.0));
    let (theta, phi) = angles();

    let project = |ppw: usize| -> Vec<f64> {
        let rv = Near2Far::from_surfaces(
            sim_data.clone(),
            surfaces.clone(),
            true,
            ppw,
            None,
            None,
        )
        .unwrap()
        .radiation_vectors(&theta, &phi)
        .unwrap();
        let mut flat = Vec::new();
        for arr in [&rv.n_theta, &rv.n_phi, &rv.l_theta, &rv.l_phi] {
            for v in arr.iter() {
                flat.push(v.re);
                flat.push(v.im);
            }
        }
        flat
    };

    let reference = project(40);
    let coarse = l2_distance(&project(5), &reference);
    let fine = l2_distance(&project(10), &reference);
    // Trapezoidal quadrature converges quadratically; doubling the
    // sampling should cut the error by about four.
    assert!(
        coarse / fine > 2.5,
        "coarse err {coarse:.3e}, fine err {fine:.3e}"
    );
}

#[test]
fn mismatched_monitor_frequencies_are_rejected() {
    let (sim_data, mut surfaces) = dipole_box(c64::new(1.0, 0.0));
    // Give one surface a different frequency list.
    let monitor = FieldMonitor::new(
        "face_0_plus",
        [BOX_HALF, 0.0, 0.0],
        [0.0, 2.0 * BOX_HALF, 2.0 * BOX_HALF],
        vec![freq() * 1.5],
    );
    surfaces[0] = Near2FarSurface::new(monitor, Direction::Plus).unwrap();
    let result = Near2Far::from_surfaces(sim_data, surfaces, true, 10, None, None);
    assert!(matches!(
        result,
        Err(Near2FarError::FrequencyNotFound { .. })
    ));
}
