// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A dispersionless background medium with optional conductivity.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{EPSILON_0, TAU},
    c64,
};

/// A non-dispersive medium described by a real relative permittivity and an
/// electric conductivity. The conductivity enters the complex permittivity
/// as `ε(ω) = ε_r + i σ / (ω ε₀)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Relative permittivity \[dimensionless\].
    pub permittivity: f64,

    /// Electric conductivity \[S/µm\].
    pub conductivity: f64,
}

impl Medium {
    pub fn new(permittivity: f64, conductivity: f64) -> Medium {
        Medium {
            permittivity,
            conductivity,
        }
    }

    /// The complex relative permittivity at frequency `freq` \[Hz\].
    pub fn eps_model(&self, freq: f64) -> c64 {
        let omega = TAU * freq;
        c64::new(self.permittivity, self.conductivity / (omega * EPSILON_0))
    }

    /// Convert a complex relative permittivity to a refractive index and an
    /// extinction coefficient via the principal square root.
    pub fn eps_complex_to_nk(eps: c64) -> (f64, f64) {
        let n_complex = eps.sqrt();
        (n_complex.re, n_complex.im)
    }

    /// Real and imaginary refractive index of this medium at `freq` \[Hz\].
    pub fn nk_model(&self, freq: f64) -> (f64, f64) {
        Medium::eps_complex_to_nk(self.eps_model(freq))
    }
}

impl Default for Medium {
    /// Vacuum.
    fn default() -> Medium {
        Medium::new(1.0, 0.0)
    }
}
