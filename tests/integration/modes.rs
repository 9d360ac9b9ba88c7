// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mode-solver scenarios checked against analytic slab-waveguide
//! dispersion.

use approx::assert_abs_diff_eq;
use ndarray::{s, Array1, Array2};
use wavefarer::{
    compute_modes, constants::C_0, c64, EpsCross, ModeSpec, SortBy, Symmetry,
};

/// A symmetric slab waveguide sampled on a uniform grid: the core occupies
/// `|x| < d/2` of a domain spanning `±half_width` with `nx` cells, uniform
/// along y.
fn slab_eps(
    nx: usize,
    half_width: f64,
    d: f64,
    n_core: f64,
    n_clad: f64,
) -> (EpsCross, [Array1<f64>; 2]) {
    let coords_x = Array1::linspace(-half_width, half_width, nx + 1);
    let coords_y = Array1::from(vec![0.0, 1.0]);
    let mut eps = Array2::from_elem((nx, 1), c64::new(n_clad * n_clad, 0.0));
    for i in 0..nx {
        let center = (coords_x[i] + coords_x[i + 1]) / 2.0;
        if center.abs() < d / 2.0 {
            eps[(i, 0)] = c64::new(n_core * n_core, 0.0);
        }
    }
    (EpsCross::Scalar(eps), [coords_x, coords_y])
}

/// All guided effective indices of the symmetric slab, found by scanning
/// the four dispersion branches (TE/TM, even/odd) for sign changes and
/// bisecting each bracket.
fn analytic_slab_neffs(d: f64, n_core: f64, n_clad: f64, wavelength: f64) -> Vec<f64> {
    let k0 = std::f64::consts::TAU / wavelength;
    let r = k0 * d / 2.0 * (n_core * n_core - n_clad * n_clad).sqrt();
    let w = |u: f64| (r * r - u * u).max(0.0).sqrt();
    let n1_sq = n_core * n_core;
    let n2_sq = n_clad * n_clad;

    let branches: Vec<Box<dyn Fn(f64) -> f64>> = vec![
        // TE even: u·tan(u) = w.
        Box::new(move |u: f64| u * u.sin() - w(u) * u.cos()),
        // TE odd: u·cot(u) = −w.
        Box::new(move |u: f64| u * u.cos() + w(u) * u.sin()),
        // TM even: tan(u) = (n1²/n2²)·w/u.
        Box::new(move |u: f64| n2_sq * u * u.sin() - n1_sq * w(u) * u.cos()),
        // TM odd: cot(u) = −(n1²/n2²)·w/u.
        Box::new(move |u: f64| n2_sq * u * u.cos() + n1_sq * w(u) * u.sin()),
    ];

    let mut neffs = Vec::new();
    for f in &branches {
        let steps = 4000;
        for s in 0..steps {
            let u0 = r * s as f64 / steps as f64 + 1e-9;
            let u1 = r * (s + 1) as f64 / steps as f64;
            let (f0, f1) = (f(u0), f(u1));
            // tan/cot poles also flip sign; a bracket is only a root when
            // the function is small somewhere inside.
            if f0.signum() == f1.signum() {
                continue;
            }
            let (mut lo, mut hi) = (u0, u1);
            for _ in 0..80 {
                let mid = (lo + hi) / 2.0;
                if f(mid).signum() == f(lo).signum() {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            let u = (lo + hi) / 2.0;
            // Discard pole crossings: a genuine root has a small residual.
            if f(u).abs() > 1e-3 * (n1_sq * r).max(1.0) {
                continue;
            }
            let kappa = 2.0 * u / d;
            let neff_sq = n1_sq - (kappa / k0).powi(2);
            if neff_sq > n2_sq {
                neffs.push(neff_sq.sqrt());
            }
        }
    }
    neffs.sort_by(|a, b| b.partial_cmp(a).unwrap());
    neffs.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    neffs
}

fn nearest(target: f64, candidates: &[f64]) -> f64 {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| {
            (a - target)
                .abs()
                .partial_cmp(&(b - target).abs())
                .unwrap()
        })
        .unwrap()
}

const WAVELENGTH: f64 = 1.55;

fn freq() -> f64 {
    C_0 / WAVELENGTH
}

#[test]
fn high_contrast_slab_fundamental_matches_analytic_te0() {
    let (eps, coords) = slab_eps(150, 1.5, 0.6, 3.48, 1.44);
    let spec = ModeSpec {
        num_modes: 3,
        target_neff: Some(3.4),
        ..Default::default()
    };
    let result =
        compute_modes(&eps, &coords, freq(), &spec, (Symmetry::None, Symmetry::None)).unwrap();

    let analytic = analytic_slab_neffs(0.6, 3.48, 1.44, WAVELENGTH);
    // The fundamental is the TE0 mode of the slab.
    assert_abs_diff_eq!(result.n_eff[0].re, analytic[0], epsilon = 1e-2);

    // Mode ordering: largest n_eff first.
    for k in 1..3 {
        assert!(result.n_eff[k].re <= result.n_eff[k - 1].re);
    }
    // Each of the top modes sits near some guided analytic branch; the
    // TM branch carries a larger staircasing error at this contrast.
    for k in 0..3 {
        let got = result.n_eff[k].re;
        assert!((got - nearest(got, &analytic)).abs() < 5e-2, "mode {k}: {got}");
    }
    // A lossless straight waveguide has no extinction.
    for k in 0..3 {
        assert!(result.n_eff[k].im.abs() < 1e-8);
    }
}

#[test]
fn pec_wall_forces_tangential_e_to_zero() {
    let (eps, coords) = slab_eps(150, 1.5, 0.6, 3.48, 1.44);
    let spec = ModeSpec {
        num_modes: 1,
        target_neff: Some(3.4),
        ..Default::default()
    };
    let result =
        compute_modes(&eps, &coords, freq(), &spec, (Symmetry::None, Symmetry::None)).unwrap();

    // Tangential E at the x-min wall (Ey, Ez at i = 0) versus the global
    // field scale.
    let e_fields = result.fields.slice(s![0, .., .., .., .., ..]);
    let e_max = e_fields.iter().map(|v| v.norm()).fold(0.0, f64::max);
    let e_wall = result
        .fields
        .slice(s![0, 1..3, 0, .., .., ..])
        .iter()
        .map(|v| v.norm())
        .fold(0.0, f64::max);
    assert!(e_wall < 1e-6 * e_max, "wall field {e_wall:e} vs max {e_max:e}");
}

#[test]
fn low_contrast_slab_spectrum_matches_analytic_roots() {
    let (eps, coords) = slab_eps(240, 3.0, 1.2, 1.6, 1.5);
    let spec = ModeSpec {
        num_modes: 2,
        target_neff: Some(1.56),
        ..Default::default()
    };
    let result =
        compute_modes(&eps, &coords, freq(), &spec, (Symmetry::None, Symmetry::None)).unwrap();

    let analytic = analytic_slab_neffs(1.2, 1.6, 1.5, WAVELENGTH);
    assert!(analytic.len() >= 2);
    for k in 0..2 {
        let got = result.n_eff[k].re;
        assert_abs_diff_eq!(got, analytic[k], epsilon = 5e-3);
        assert!(result.n_eff[k].im.abs() < 1e-8);
    }
}

#[test]
fn pmc_symmetry_plane_reproduces_the_even_fundamental() {
    // Full-domain reference.
    let (eps_full, coords_full) = slab_eps(240, 3.0, 1.2, 1.6, 1.5);
    let spec = ModeSpec {
        num_modes: 1,
        target_neff: Some(1.56),
        ..Default::default()
    };
    let full = compute_modes(
        &eps_full,
        &coords_full,
        freq(),
        &spec,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();

    // Half domain [0, 3] with a PMC mirror at x = 0: keeps the even TE
    // fundamental.
    let nx = 120;
    let coords_x = Array1::linspace(0.0, 3.0, nx + 1);
    let coords_y = Array1::from(vec![0.0, 1.0]);
    let mut eps = Array2::from_elem((nx, 1), c64::new(1.5 * 1.5, 0.0));
    for i in 0..nx {
        let center = (coords_x[i] + coords_x[i + 1]) / 2.0;
        if center < 0.6 {
            eps[(i, 0)] = c64::new(1.6 * 1.6, 0.0);
        }
    }
    let half = compute_modes(
        &EpsCross::Scalar(eps),
        &[coords_x, coords_y],
        freq(),
        &spec,
        (Symmetry::Pmc, Symmetry::None),
    )
    .unwrap();

    assert_abs_diff_eq!(half.n_eff[0].re, full.n_eff[0].re, epsilon = 3e-3);
}

#[test]
fn tilted_waveguide_recovers_the_straight_effective_index() {
    // The angled solve runs through the tensorial operator; after the
    // k-vector rescaling the physical effective index must match the
    // straight solve.
    let (eps, coords) = slab_eps(240, 3.0, 1.2, 1.6, 1.5);
    let straight_spec = ModeSpec {
        num_modes: 1,
        target_neff: Some(1.56),
        ..Default::default()
    };
    let straight = compute_modes(
        &eps,
        &coords,
        freq(),
        &straight_spec,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();

    let angled_spec = ModeSpec {
        angle_theta: std::f64::consts::FRAC_PI_6,
        angle_phi: 0.0,
        ..straight_spec
    };
    let angled = compute_modes(
        &eps,
        &coords,
        freq(),
        &angled_spec,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();

    let ratio = angled.n_eff[0].re / straight.n_eff[0].re;
    assert_abs_diff_eq!(ratio, 1.0, epsilon = 1e-6);
}

#[test]
fn bent_waveguide_radiates() {
    // A tight bend of a weakly guiding slab leaks outward; with PML on the
    // radial edges the leakage shows up as a positive extinction
    // coefficient.
    let (eps, coords) = slab_eps(240, 3.0, 1.2, 1.6, 1.5);
    // The bend pushes the mode outward, so the effective index (measured
    // at the centre radius) sits a little above the straight value.
    let spec = ModeSpec {
        num_modes: 1,
        target_neff: Some(1.62),
        num_pml: (25, 0),
        bend_radius: Some(8.0),
        bend_axis: 1,
        ..Default::default()
    };
    let result =
        compute_modes(&eps, &coords, freq(), &spec, (Symmetry::None, Symmetry::None)).unwrap();

    let n_eff = result.n_eff[0];
    assert!(n_eff.re > 1.5 && n_eff.re < 1.75, "n_eff {n_eff}");
    assert!(n_eff.im > 1e-7, "expected radiation loss, k_eff = {:e}", n_eff.im);
}

#[test]
fn pml_leaves_a_well_guided_mode_untouched() {
    let (eps, coords) = slab_eps(240, 3.0, 1.2, 1.6, 1.5);
    let spec_plain = ModeSpec {
        num_modes: 1,
        target_neff: Some(1.56),
        ..Default::default()
    };
    let spec_pml = ModeSpec {
        num_pml: (30, 0),
        ..spec_plain.clone()
    };
    let plain = compute_modes(
        &eps,
        &coords,
        freq(),
        &spec_plain,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();
    let with_pml = compute_modes(
        &eps,
        &coords,
        freq(),
        &spec_pml,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();

    assert_abs_diff_eq!(with_pml.n_eff[0].re, plain.n_eff[0].re, epsilon = 5e-3);
    assert!(with_pml.n_eff[0].im.abs() < 1e-4);
}

#[test]
fn sort_by_te_fraction_orders_by_polarization() {
    let (eps, coords) = slab_eps(150, 1.5, 0.6, 3.48, 1.44);
    let spec = ModeSpec {
        num_modes: 3,
        target_neff: Some(3.4),
        sort_by: SortBy::TeFraction,
        ..Default::default()
    };
    let result =
        compute_modes(&eps, &coords, freq(), &spec, (Symmetry::None, Symmetry::None)).unwrap();

    let te_fraction = |k: usize| -> f64 {
        let ex: f64 = result
            .fields
            .slice(s![0, 0, .., .., .., k])
            .iter()
            .map(|v| v.norm_sqr())
            .sum();
        let ey: f64 = result
            .fields
            .slice(s![0, 1, .., .., .., k])
            .iter()
            .map(|v| v.norm_sqr())
            .sum();
        ex / (ex + ey)
    };
    let fractions: Vec<f64> = (0..3).map(te_fraction).collect();
    assert!(fractions[0] >= fractions[1] && fractions[1] >= fractions[2]);
    // In this slab the x-polarized family leads the sort.
    assert!(fractions[0] > 0.9, "fractions {fractions:?}");
}

#[test]
fn pec_sentinel_cell_suppresses_the_field() {
    // A metal cell in the middle of a uniform dielectric: the mode must
    // avoid it.
    let nx = 100;
    let coords_x = Array1::linspace(-1.0, 1.0, nx + 1);
    let coords_y = Array1::from(vec![0.0, 1.0]);
    let mut eps = Array2::from_elem((nx, 1), c64::new(4.0, 0.0));
    eps[(nx / 2, 0)] = c64::new(wavefarer::constants::PEC_VAL, 0.0);
    let spec = ModeSpec {
        num_modes: 1,
        target_neff: Some(1.9),
        ..Default::default()
    };
    let result = compute_modes(
        &EpsCross::Scalar(eps),
        &[coords_x, coords_y],
        freq(),
        &spec,
        (Symmetry::None, Symmetry::None),
    )
    .unwrap();

    let e_max = result
        .fields
        .slice(s![0, .., .., .., .., 0])
        .iter()
        .map(|v| v.norm())
        .fold(0.0, f64::max);
    let e_pec = result
        .fields
        .slice(s![0, .., nx / 2, .., .., 0])
        .iter()
        .map(|v| v.norm())
        .fold(0.0, f64::max);
    assert!(e_pec < 1e-5 * e_max, "field in PEC cell {e_pec:e} vs {e_max:e}");
}
