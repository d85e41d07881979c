// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for gain-table construction and application.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GainError {
    #[error("cannot make a gain table from a dataset with no rows")]
    NoRows,

    #[error("the gain table has {gains} channels but the dataset has {vis}; only a single-channel table can be broadcast")]
    ChannelMismatch { gains: usize, vis: usize },

    #[error("the gain table has {gains} polarisations but the dataset has {vis}")]
    PolMismatch { gains: usize, vis: usize },

    #[error("row {row} uses antenna {antenna} but the gain table only covers {nant} antennas")]
    AntennaOutOfRange {
        row: usize,
        antenna: usize,
        nant: usize,
    },
}
