// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for image construction and facet operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image data has {nchan} channels but the geometry has {nfreq} frequencies")]
    FrequencyCount { nchan: usize, nfreq: usize },

    #[error("image must be square but is {ny}x{nx}")]
    NotSquare { ny: usize, nx: usize },

    #[error("image size {npix} cannot be split into {facets} facets per axis")]
    FacetDivision { npix: usize, facets: usize },

    #[error("expected {expected} facet images but got {got}")]
    FacetCount { expected: usize, got: usize },

    #[error("images have mismatched shapes: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        lhs: (usize, usize, usize, usize),
        rhs: (usize, usize, usize, usize),
    },

    #[error("sum-of-weights shape {got:?} does not match image channel/polarisation counts {expected:?}")]
    WeightShape {
        got: (usize, usize),
        expected: (usize, usize),
    },
}
