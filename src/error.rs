// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all visweave-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisweaveError {
    #[error(transparent)]
    Vis(#[from] crate::vis::VisError),

    #[error(transparent)]
    Image(#[from] crate::image::ImageError),

    #[error(transparent)]
    SkyModel(#[from] crate::srclist::SkyModelError),

    #[error(transparent)]
    Gain(#[from] crate::gains::GainError),

    #[error(transparent)]
    Imaging(#[from] crate::imaging::ImagingError),

    #[error(transparent)]
    Graph(#[from] crate::graph::GraphError),

    #[error(transparent)]
    Compose(#[from] crate::compose::ComposeError),

    #[error(transparent)]
    Solve(#[from] crate::skymodel_cal::SolveError),
}
