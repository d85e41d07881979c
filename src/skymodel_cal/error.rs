// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for calibration solving.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("at least one calibration window is needed")]
    NoWindows,

    #[error("niter must be at least 1")]
    Niter,

    #[error("gain must be in (0, 1] but is {got}")]
    Damping { got: f64 },

    #[error("tol must be positive and finite but is {got}")]
    Tol { got: f64 },

    #[error("gain solve produced a non-finite solution for antenna {antenna}, channel {chan}")]
    Singular { antenna: usize, chan: usize },

    #[error("the model visibilities are all zero; nothing constrains the gains")]
    EmptyModel,

    #[error("gain solve did not converge: still at {precision:.3e} after {iterations} iterations")]
    DidNotConverge { iterations: usize, precision: f64 },

    #[error("{models} model datasets were given for {observed} observed datasets")]
    GlobalLists { observed: usize, models: usize },

    #[error(transparent)]
    Vis(#[from] crate::vis::VisError),

    #[error(transparent)]
    GainTable(#[from] crate::gains::GainError),

    #[error(transparent)]
    Imaging(#[from] crate::imaging::ImagingError),
}
