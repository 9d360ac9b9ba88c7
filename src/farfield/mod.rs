// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Near-field to far-field transformation.
//!
//! [`Near2Far`] takes the tangential fields recorded on a set of planar
//! monitors forming a closed surface around a source, converts them to
//! equivalent surface currents, and integrates those into the far-field
//! radiation vectors N_θ, N_φ, L_θ, L_φ at requested observation angles.

mod currents;
mod error;
mod radiation;
mod surface;

pub use error::Near2FarError;
pub use surface::Near2FarSurface;

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use ndarray::{s, Array1, Array3};

use crate::{
    constants::{C_0, TAU},
    medium::Medium,
    monitor::{Direction, FieldMonitor},
    sim_data::SimulationData,
    c64,
};
use currents::{compute_surface_currents, SurfaceCurrents};

/// Default number of points per wavelength in the background medium used
/// when resampling surface currents.
pub const PTS_PER_WAVELENGTH: usize = 10;

/// Far-field radiation vectors on a `(θ, φ, frequency)` grid.
#[derive(Clone, Debug)]
pub struct RadiationVectors {
    pub theta: Array1<f64>,
    pub phi: Array1<f64>,
    pub freqs: Vec<f64>,
    pub n_theta: Array3<c64>,
    pub n_phi: Array3<c64>,
    pub l_theta: Array3<c64>,
    pub l_phi: Array3<c64>,
}

/// The near-field to far-field projector. Construction validates the
/// surfaces and computes all surface currents once; projection to any set
/// of observation angles is then a pure integration.
#[derive(Clone, Debug)]
pub struct Near2Far {
    sim_data: SimulationData,
    surfaces: Vec<Near2FarSurface>,
    medium: Medium,
    origin: [f64; 3],
    frequencies: Vec<f64>,
    currents: HashMap<String, SurfaceCurrents>,
}

impl Near2Far {
    /// Build a projector from surfaces with explicit options.
    ///
    /// `medium` defaults to the simulation background; `origin` defaults to
    /// the centroid of the surface monitor centres. With `resample` false,
    /// `pts_per_wavelength` has no effect and the Yee cell centres are used
    /// as integration points.
    pub fn from_surfaces(
        sim_data: SimulationData,
        surfaces: Vec<Near2FarSurface>,
        resample: bool,
        pts_per_wavelength: usize,
        medium: Option<Medium>,
        origin: Option<[f64; 3]>,
    ) -> Result<Near2Far, Near2FarError> {
        if surfaces.is_empty() {
            return Err(Near2FarError::NoSurfaces);
        }

        let medium = medium.unwrap_or(sim_data.simulation.medium);
        let origin = origin.unwrap_or_else(|| centroid(&surfaces));
        if origin.iter().any(|v| !v.is_finite()) {
            return Err(Near2FarError::NonFiniteOrigin(origin));
        }

        // Every surface must share one frequency list; the radiation
        // vectors get a common frequency axis.
        let frequencies = surfaces[0].monitor().freqs.clone();
        for surface in &surfaces[1..] {
            let freqs = &surface.monitor().freqs;
            if freqs != &frequencies {
                let missing = frequencies
                    .iter()
                    .find(|f| !freqs.contains(f))
                    .copied()
                    .unwrap_or_else(|| freqs[0]);
                return Err(Near2FarError::FrequencyNotFound {
                    freq: missing,
                    monitor: surface.monitor().name.clone(),
                });
            }
        }

        let mut currents = HashMap::new();
        for surface in &surfaces {
            let data = compute_surface_currents(
                &sim_data,
                surface,
                &medium,
                resample,
                pts_per_wavelength,
            )?;
            currents.insert(surface.monitor().name.clone(), data);
        }
        debug!(
            "near-to-far projector ready: {} surface(s), {} frequencies, origin {:?}",
            surfaces.len(),
            frequencies.len(),
            origin
        );

        Ok(Near2Far {
            sim_data,
            surfaces,
            medium,
            origin,
            frequencies,
            currents,
        })
    }

    /// Build a projector from monitors and their outward normal directions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_near_field_monitors(
        sim_data: SimulationData,
        monitors: Vec<FieldMonitor>,
        normal_dirs: Vec<Direction>,
        resample: bool,
        pts_per_wavelength: usize,
        medium: Option<Medium>,
        origin: Option<[f64; 3]>,
    ) -> Result<Near2Far, Near2FarError> {
        if monitors.len() != normal_dirs.len() {
            return Err(Near2FarError::MonitorCountMismatch {
                monitors: monitors.len(),
                dirs: normal_dirs.len(),
            });
        }
        let surfaces = monitors
            .into_iter()
            .zip(normal_dirs)
            .map(|(monitor, dir)| Near2FarSurface::new(monitor, dir))
            .collect::<Result<Vec<_>, _>>()?;
        Near2Far::from_surfaces(
            sim_data,
            surfaces,
            resample,
            pts_per_wavelength,
            medium,
            origin,
        )
    }

    /// The frequencies shared by all surfaces.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// The local origin used as phase reference.
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// The simulation data this projector reads from.
    pub fn sim_data(&self) -> &SimulationData {
        &self.sim_data
    }

    /// The complex wave number of the background medium at `freq`.
    pub fn wave_number(&self, freq: f64) -> c64 {
        let (index_n, index_k) = self.medium.nk_model(freq);
        c64::new(index_n, index_k) * (TAU * freq / C_0)
    }

    /// Compute the radiation vectors at the given observation angles.
    /// `theta` is the polar angle from the +z axis, `phi` the azimuth from
    /// the +x axis, both in radians.
    pub fn radiation_vectors(
        &self,
        theta: &[f64],
        phi: &[f64],
    ) -> Result<RadiationVectors, Near2FarError> {
        self.radiation_vectors_with_progress(theta, phi, false)
    }

    /// As [`Near2Far::radiation_vectors`], optionally drawing a progress
    /// bar while integrating.
    pub fn radiation_vectors_with_progress(
        &self,
        theta: &[f64],
        phi: &[f64],
        draw_progress_bar: bool,
    ) -> Result<RadiationVectors, Near2FarError> {
        let theta = Array1::from(theta.to_vec());
        let phi = Array1::from(phi.to_vec());
        let num_freqs = self.frequencies.len();
        let shape = (theta.len(), phi.len(), num_freqs);

        let mut out = RadiationVectors {
            theta: theta.clone(),
            phi: phi.clone(),
            freqs: self.frequencies.clone(),
            n_theta: Array3::zeros(shape),
            n_phi: Array3::zeros(shape),
            l_theta: Array3::zeros(shape),
            l_phi: Array3::zeros(shape),
        };

        let progress = make_progress_bar(
            (theta.len() * num_freqs * self.surfaces.len()) as u64,
            draw_progress_bar,
        );

        for (i_f, &freq) in self.frequencies.iter().enumerate() {
            let k = self.wave_number(freq);
            for surface in &self.surfaces {
                let name = &surface.monitor().name;
                let currents = &self.currents[name];
                let freq_index = currents
                    .freqs
                    .iter()
                    .position(|&f| f == freq)
                    .ok_or_else(|| Near2FarError::FrequencyNotFound {
                        freq,
                        monitor: name.clone(),
                    })?;

                let contribution = radiation::radiation_vectors_for_surface(
                    k,
                    &theta,
                    &phi,
                    surface,
                    currents,
                    freq_index,
                    self.origin,
                    &progress,
                );

                // Surfaces add; frequencies stay independent.
                let mut slice = out.n_theta.slice_mut(s![.., .., i_f]);
                slice += &contribution.n_theta;
                let mut slice = out.n_phi.slice_mut(s![.., .., i_f]);
                slice += &contribution.n_phi;
                let mut slice = out.l_theta.slice_mut(s![.., .., i_f]);
                slice += &contribution.l_theta;
                let mut slice = out.l_phi.slice_mut(s![.., .., i_f]);
                slice += &contribution.l_phi;
            }
        }
        progress.finish_and_clear();
        info!(
            "far-field projection finished: {} angles x {} frequencies",
            theta.len() * phi.len(),
            num_freqs
        );

        Ok(out)
    }
}

fn centroid(surfaces: &[Near2FarSurface]) -> [f64; 3] {
    let mut origin = [0.0; 3];
    for surface in surfaces {
        for (axis, o) in origin.iter_mut().enumerate() {
            *o += surface.monitor().center[axis];
        }
    }
    let n = surfaces.len() as f64;
    [origin[0] / n, origin[1] / n, origin[2] / n]
}

fn make_progress_bar(len: u64, draw: bool) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(len),
        if draw {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg}: [{wide_bar:.blue}] {pos:4}/{len:4} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_message("Projecting far fields")
}
