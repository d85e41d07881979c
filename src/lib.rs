// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Task-graph orchestration for radio interferometric imaging and SAGE sky-model
calibration.

This crate builds directed acyclic graphs of pure imaging and calibration
operations over partitioned visibility datasets. Datasets are sliced along
time or the w baseline coordinate by [`partition::Partitions`], model images
are split into facets, and the resulting per-cell predict/invert operations
are composed into a [`graph::TaskGraph`] whose evaluation is delegated to a
swappable [`graph::Evaluator`]. Direction-dependent calibration is handled by
the [`skymodel_cal`] module, which constructs the iterated E/M steps of the
SAGE algorithm as a graph with a single global synchronisation point per
iteration.

The numerical imaging operators are behind the [`imaging::Imager`] trait; a
direct-Fourier reference implementation is provided so that everything here
can be exercised without an external gridder.
 */

pub mod compose;
pub mod constants;
mod error;
pub mod gains;
pub mod graph;
pub mod image;
pub mod imaging;
pub(crate) mod math;
pub mod partition;
pub mod skymodel_cal;
pub mod srclist;
pub mod vis;

// Re-exports.
pub use compose::{
    compose_invert, compose_predict, compose_residual, ImagingOptions, PartitionAxis,
};
pub use error::VisweaveError;
pub use gains::{apply_gaintable, create_gaintable, GainTable};
pub use graph::{Evaluator, Handle, PoolEvaluator, SerialEvaluator, TaskGraph, Value};
pub use image::{Image, ImageGeometry, SumWeights};
pub use imaging::{DftImager, Imager};
pub use partition::{PartitionCursor, PartitionMask, Partitions};
pub use skymodel_cal::{CalWindow, SageOptions};
pub use srclist::{ComponentShape, SkyModel, Skycomponent};
pub use vis::Visibility;

// External re-exports.
pub use marlu::{c64, RADec};
