// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A near-field surface: a planar field monitor plus the orientation of its
//! outward normal.

use serde::{Deserialize, Serialize};

use super::Near2FarError;
use crate::monitor::{Direction, FieldMonitor};

/// One face of the closed surface enclosing the radiation source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Near2FarSurface {
    monitor: FieldMonitor,
    normal_dir: Direction,
    axis: usize,
}

impl Near2FarSurface {
    /// Fails with [`Near2FarError::NonPlanarMonitor`] if the monitor's size
    /// does not have exactly one zero component.
    pub fn new(monitor: FieldMonitor, normal_dir: Direction) -> Result<Self, Near2FarError> {
        let axis = monitor
            .plane_axis()
            .ok_or_else(|| Near2FarError::NonPlanarMonitor {
                name: monitor.name.clone(),
                size: monitor.size,
            })?;
        Ok(Near2FarSurface {
            monitor,
            normal_dir,
            axis,
        })
    }

    pub fn monitor(&self) -> &FieldMonitor {
        &self.monitor
    }

    pub fn normal_dir(&self) -> Direction {
        self.normal_dir
    }

    /// The axis normal to this surface.
    pub fn axis(&self) -> usize {
        self.axis
    }
}
