// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all wavefarer-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::{farfield::Near2FarError, linalg::LinalgError, modes::ModeError};

#[derive(Error, Debug)]
pub enum WavefarerError {
    #[error("{0}")]
    Mode(#[from] ModeError),

    #[error("{0}")]
    Near2Far(#[from] Near2FarError),

    #[error("{0}")]
    Linalg(#[from] LinalgError),
}
