// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Equivalent surface currents from tangential near fields.
//!
//! By the surface equivalence principle the fields outside a closed surface
//! are reproduced by the surface currents `J = n̂×H` and `M = −n̂×E`. The
//! extraction swaps the two tangential components and applies orientation
//! signs; the normal components of E and H are discarded. The currents are
//! then colocated on one regular grid so the radiation integrals can use
//! plain 2D quadrature.

use log::debug;
use ndarray::{Array1, Array3, Axis};

use super::{surface::Near2FarSurface, Near2FarError};
use crate::{
    constants::C_0,
    field_data::{FieldData, ScalarFieldArray},
    medium::Medium,
    monitor::{pop_axis, Direction},
    sim_data::SimulationData,
    c64,
};

/// Tangential surface currents colocated on a regular grid. The tangential
/// axes `(u, v)` are the non-normal axes in axis order.
#[derive(Clone, Debug)]
pub(crate) struct SurfaceCurrents {
    /// Colocation points along x, y, z; the normal axis holds one point.
    pub(crate) pts: [Array1<f64>; 3],
    pub(crate) freqs: Vec<f64>,
    /// Electric surface current along u, shape `(|u|, |v|, |freqs|)`.
    pub(crate) j_u: Array3<c64>,
    pub(crate) j_v: Array3<c64>,
    /// Magnetic surface current along u.
    pub(crate) m_u: Array3<c64>,
    pub(crate) m_v: Array3<c64>,
}

/// Extract, orient and resample the surface currents of one near-field
/// surface.
pub(crate) fn compute_surface_currents(
    sim_data: &SimulationData,
    surface: &Near2FarSurface,
    medium: &Medium,
    resample: bool,
    pts_per_wavelength: usize,
) -> Result<SurfaceCurrents, Near2FarError> {
    let monitor = surface.monitor();
    let field_data = sim_data
        .field_data(&monitor.name)
        .ok_or_else(|| Near2FarError::MissingMonitor(monitor.name.clone()))?;

    let (j_u, j_v, m_u, m_v) = fields_to_currents(field_data, surface)?;
    let pts = colocation_points(sim_data, surface, medium, resample, pts_per_wavelength);
    debug!(
        "monitor '{}': colocating currents on {}x{}x{} points",
        monitor.name,
        pts[0].len(),
        pts[1].len(),
        pts[2].len()
    );

    let axis = surface.axis();
    let squeeze = |f: &ScalarFieldArray| -> Array3<c64> {
        f.colocate(&pts).values.index_axis_move(Axis(axis), 0)
    };

    Ok(SurfaceCurrents {
        j_u: squeeze(&j_u),
        j_v: squeeze(&j_v),
        m_u: squeeze(&m_u),
        m_v: squeeze(&m_v),
        pts,
        freqs: monitor.freqs.clone(),
    })
}

/// `J = n̂×H`, `M = −n̂×E` on the Yee grid: the tangential components swap
/// places and pick up orientation signs.
fn fields_to_currents(
    field_data: &FieldData,
    surface: &Near2FarSurface,
) -> Result<(ScalarFieldArray, ScalarFieldArray, ScalarFieldArray, ScalarFieldArray), Near2FarError>
{
    let axis = surface.axis();
    let (_, (c1, c2)) = pop_axis([0usize, 1, 2], axis);

    let mut signs = [-1.0, 1.0];
    if axis % 2 != 0 {
        signs = [-signs[0], -signs[1]];
    }
    if surface.normal_dir() == Direction::Minus {
        signs = [-signs[0], -signs[1]];
    }

    let component = |fields: &[Option<ScalarFieldArray>; 3],
                     kind: char,
                     c: usize|
     -> Result<ScalarFieldArray, Near2FarError> {
        fields[c]
            .clone()
            .ok_or_else(|| Near2FarError::MissingFieldComponent {
                monitor: surface.monitor().name.clone(),
                component: format!("{kind}{}", ["x", "y", "z"][c]),
            })
    };

    // J_c1 = s0·H_c2, J_c2 = s1·H_c1; M_c1 = s1·E_c2, M_c2 = s0·E_c1.
    let j_u = component(&field_data.h, 'H', c2)?.scaled(c64::new(signs[0], 0.0));
    let j_v = component(&field_data.h, 'H', c1)?.scaled(c64::new(signs[1], 0.0));
    let m_u = component(&field_data.e, 'E', c2)?.scaled(c64::new(signs[1], 0.0));
    let m_v = component(&field_data.e, 'E', c1)?.scaled(c64::new(signs[0], 0.0));
    Ok((j_u, j_v, m_u, m_v))
}

/// The regular grid on which all currents of one surface are colocated.
///
/// Without resampling these are the Yee cell centres of the monitor. With
/// resampling, each tangential axis is sampled uniformly with
/// `pts_per_wavelength` points per background wavelength at the highest
/// monitor frequency, clamped to the simulation bounds so "infinite"
/// monitors integrate over the simulated region only.
fn colocation_points(
    sim_data: &SimulationData,
    surface: &Near2FarSurface,
    medium: &Medium,
    resample: bool,
    pts_per_wavelength: usize,
) -> [Array1<f64>; 3] {
    let monitor = surface.monitor();
    let axis = surface.axis();

    if !resample {
        let mut pts = sim_data.at_centers(monitor);
        pts[axis] = Array1::from(vec![monitor.center[axis]]);
        return pts;
    }

    // The smallest wavelength bounds the sampling density.
    let f_max = monitor.freqs.iter().copied().fold(f64::NAN, f64::max);
    let (index_n, _) = medium.nk_model(f_max);
    let wavelength = C_0 / f_max / index_n;

    let (_, (idx_u, idx_v)) = pop_axis([0usize, 1, 2], axis);
    let mut pts = [
        Array1::zeros(0),
        Array1::zeros(0),
        Array1::zeros(0),
    ];
    pts[axis] = Array1::from(vec![monitor.center[axis]]);
    for idx in [idx_u, idx_v] {
        let (mon_lo, mon_hi) = monitor.bounds(idx);
        let (sim_lo, sim_hi) = sim_data.simulation.bounds(idx);
        let start = mon_lo.max(sim_lo);
        let stop = mon_hi.min(sim_hi);
        let num_pts = ((pts_per_wavelength as f64 * (stop - start) / wavelength).ceil() as usize)
            .max(1);
        pts[idx] = Array1::linspace(start, stop, num_pts);
    }
    pts
}
