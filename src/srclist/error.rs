// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for sky-model construction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyModelError {
    #[error("component '{name}' has {nfreq} frequencies but its flux has {nflux} rows")]
    FluxShape {
        name: String,
        nfreq: usize,
        nflux: usize,
    },
}
