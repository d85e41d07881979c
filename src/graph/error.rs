// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for task-graph construction and evaluation.

use thiserror::Error;

use super::ValueKind;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("expected a {expected} value but got a {got}")]
    WrongValueKind { expected: ValueKind, got: ValueKind },

    #[error("the operation expected {expected} inputs but was given {got}")]
    WrongArity { expected: usize, got: usize },

    #[error("the operation declared {declared} outputs but produced {produced}")]
    WrongOutputArity { declared: usize, produced: usize },

    #[error("node '{label}' failed: {source}")]
    Node {
        label: String,
        #[source]
        source: Box<GraphError>,
    },

    #[error("a worker thread died before finishing its nodes")]
    WorkerDied,

    #[error(transparent)]
    Vis(#[from] crate::vis::VisError),

    #[error(transparent)]
    Image(#[from] crate::image::ImageError),

    #[error(transparent)]
    Gain(#[from] crate::gains::GainError),

    #[error(transparent)]
    Imaging(#[from] crate::imaging::ImagingError),

    #[error(transparent)]
    Solve(#[from] crate::skymodel_cal::SolveError),
}
