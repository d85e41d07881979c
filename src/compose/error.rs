// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for graph composition.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("facets must be at least 1")]
    Facets,

    #[error("the model image has {image} channels but the dataset has {vis}")]
    ChannelMismatch { image: usize, vis: usize },

    #[error("the model image has {image} polarisations but the dataset has {vis}")]
    PolMismatch { image: usize, vis: usize },

    #[error(transparent)]
    Image(#[from] crate::image::ImageError),
}
