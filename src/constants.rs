// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. The internal length unit is the
micrometre; frequencies are in Hz, so the speed of light below carries
µm·Hz units and all wavelengths and coordinates are in µm.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Speed of light in the internal length unit \[µm·Hz\].
pub const C_0: f64 = 2.997924585809468e14;

/// Impedance of free space \[Ω\].
pub const ETA_0: f64 = 376.730313668;

/// Permittivity of free space in the internal unit system.
pub const EPSILON_0: f64 = 1.0 / (ETA_0 * C_0);

/// Sentinel relative permittivity marking perfect-electric-conductor cells.
/// Large and negative so that no physical medium can collide with it.
pub const PEC_VAL: f64 = -1e11;

/// Double-precision floating-point epsilon; relative tolerance handed to the
/// eigensolver.
pub const FP_EPS: f64 = 2.220446049250313e-16;

/// Polynomial order of the PML conductivity profile.
pub const PML_CURVE_ORDER: f64 = 3.0;

/// Natural log of the target reflection coefficient of a full-thickness PML.
pub const PML_TARGET_LN_R: f64 = -30.0;

/// PML conductivities above this value are suspicious: the profile is so
/// steep that the discrete layer reflects instead of absorbing.
pub const PML_SIGMA_WARN: f64 = 100.0;
