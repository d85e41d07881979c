// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for visibility-dataset construction and row operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisError {
    #[error("uvw has {uvw_rows} rows but there are {rows} visibility rows")]
    RowCount { uvw_rows: usize, rows: usize },

    #[error("uvw must have 3 columns but has {got}")]
    UvwColumns { got: usize },

    #[error("the '{column}' column has {got} rows but there are {rows} visibility rows")]
    ColumnLength {
        column: &'static str,
        got: usize,
        rows: usize,
    },

    #[error("weight shape {weight:?} does not match vis shape {vis:?}")]
    WeightShape {
        weight: (usize, usize, usize),
        vis: (usize, usize, usize),
    },

    #[error("vis has {nchan} channels but {nfreq} frequencies were supplied")]
    FrequencyCount { nchan: usize, nfreq: usize },

    #[error("partition mask has length {mask} but the dataset has {rows} rows")]
    MaskLength { mask: usize, rows: usize },

    #[error("the partition has {got} rows but the mask selects {expected}")]
    ScatterRows { got: usize, expected: usize },

    #[error("datasets have mismatched shapes: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        lhs: (usize, usize, usize),
        rhs: (usize, usize, usize),
    },

    #[error("cannot gather an empty list of datasets")]
    EmptyGather,

    #[error("datasets to gather have {lhs} and {rhs} rows")]
    GatherRows { lhs: usize, rhs: usize },
}
