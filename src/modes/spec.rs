// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration of the mode solver.

use serde::{Deserialize, Serialize};

use super::ModeError;
use crate::constants::FRAC_PI_2;

/// Ordering of the returned modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    /// Descending real part of the effective index.
    LargestNeff,
    /// Descending fraction of the in-plane electric field polarized along x.
    TeFraction,
    /// Descending fraction of the in-plane electric field polarized along y.
    TmFraction,
}

/// Symmetry condition on the near (minimum-coordinate) boundary of a
/// transverse axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symmetry {
    /// No symmetry plane; the boundary is a perfect electric conductor.
    None,
    /// Anti-symmetry plane (E_tangential = 0): also a PEC wall.
    Pec,
    /// Symmetry plane (H_tangential = 0): a PMC wall.
    Pmc,
}

impl Symmetry {
    pub(crate) fn is_pmc(self) -> bool {
        self == Symmetry::Pmc
    }

    /// PML is only placed on a near boundary that is not a symmetry plane.
    pub(crate) fn allows_near_pml(self) -> bool {
        self == Symmetry::None
    }
}

/// Parameters of a mode solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeSpec {
    /// Number of eigenmodes to compute.
    pub num_modes: usize,

    /// Initial guess for the effective index used by the shift-invert
    /// eigensolver. `None` means "derive from the largest permittivity in
    /// the cross-section".
    pub target_neff: Option<f64>,

    /// Number of PML cells on the two transverse axes. The layers occupy
    /// the outermost cells of the provided grid.
    pub num_pml: (usize, usize),

    /// Radius of curvature of a waveguide bend \[µm\]. `None` means a
    /// straight waveguide. The bend centre lies on the line through the
    /// coordinate origin of the plane, offset by the radius along the
    /// in-plane axis normal to `bend_axis`.
    pub bend_radius: Option<f64>,

    /// The in-plane axis (0 or 1) parallel to the bend's axis of rotation.
    pub bend_axis: usize,

    /// Polar tilt of the propagation axis \[rad\]; 0 means untilted.
    pub angle_theta: f64,

    /// Azimuthal orientation of the tilt \[rad\].
    pub angle_phi: f64,

    /// Requested ordering of the returned modes.
    pub sort_by: SortBy,
}

impl Default for ModeSpec {
    fn default() -> ModeSpec {
        ModeSpec {
            num_modes: 1,
            target_neff: None,
            num_pml: (0, 0),
            bend_radius: None,
            bend_axis: 0,
            angle_theta: 0.0,
            angle_phi: 0.0,
            sort_by: SortBy::LargestNeff,
        }
    }
}

impl ModeSpec {
    pub fn validate(&self) -> Result<(), ModeError> {
        if self.num_modes == 0 {
            return Err(ModeError::InvalidModeSpec(
                "num_modes must be at least 1".to_string(),
            ));
        }
        if let Some(target) = self.target_neff {
            if !(target > 0.0) || !target.is_finite() {
                return Err(ModeError::InvalidModeSpec(format!(
                    "target_neff must be positive and finite, got {target}"
                )));
            }
        }
        if let Some(radius) = self.bend_radius {
            if radius == 0.0 || !radius.is_finite() {
                return Err(ModeError::InvalidModeSpec(format!(
                    "bend_radius must be finite and non-zero, got {radius}"
                )));
            }
        }
        if self.bend_axis > 1 {
            return Err(ModeError::InvalidModeSpec(format!(
                "bend_axis must be 0 or 1, got {}",
                self.bend_axis
            )));
        }
        if !(0.0..FRAC_PI_2).contains(&self.angle_theta) {
            return Err(ModeError::InvalidModeSpec(format!(
                "angle_theta must lie in [0, pi/2), got {}",
                self.angle_theta
            )));
        }
        if !self.angle_phi.is_finite() {
            return Err(ModeError::InvalidModeSpec(
                "angle_phi must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
