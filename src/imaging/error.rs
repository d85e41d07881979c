// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for the imaging operators.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("the image has {image} channels but the dataset has {vis}")]
    ChannelMismatch { image: usize, vis: usize },

    #[error("the image has {image} polarisations but the dataset has {vis}")]
    PolMismatch { image: usize, vis: usize },

    #[error("component '{name}' has {component} flux channels but the dataset has {vis}")]
    ComponentChannels {
        name: String,
        component: usize,
        vis: usize,
    },

    #[error("component '{name}' has {component} flux polarisations but the dataset has {vis}")]
    ComponentPols {
        name: String,
        component: usize,
        vis: usize,
    },
}
