// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structures to describe sky-model sources and their components.

mod error;

pub use error::SkyModelError;

use marlu::RADec;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use crate::image::Image;

/// A single sky-model component: a direction, per-channel flux densities, and
/// a shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Skycomponent {
    /// A user-friendly name.
    pub name: String,

    /// The sky direction of the component.
    #[serde(flatten)]
    pub direction: RADec,

    /// The frequency of each flux row \[Hz\].
    pub frequency: Vec1<f64>,

    /// Flux densities, `[channel][polarisation]` \[Jy\].
    pub flux: Array2<f64>,

    /// The shape of the component.
    pub shape: ComponentShape,
}

/// Component shapes. Shape-dependent parameters live on the variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentShape {
    Point,

    Gaussian {
        /// Major axis size \[radians\].
        maj: f64,

        /// Minor axis size \[radians\].
        min: f64,

        /// Position angle \[radians\].
        pa: f64,
    },
}

impl Skycomponent {
    /// Construct a component, enforcing that the frequency axis and the flux
    /// array's leading dimension match.
    pub fn new(
        name: String,
        direction: RADec,
        frequency: Vec1<f64>,
        flux: Array2<f64>,
        shape: ComponentShape,
    ) -> Result<Skycomponent, SkyModelError> {
        if frequency.len() != flux.len_of(Axis(0)) {
            return Err(SkyModelError::FluxShape {
                name,
                nfreq: frequency.len(),
                nflux: flux.len_of(Axis(0)),
            });
        }
        Ok(Skycomponent {
            name,
            direction,
            frequency,
            flux,
            shape,
        })
    }

    pub fn nchan(&self) -> usize {
        self.flux.len_of(Axis(0))
    }

    pub fn npol(&self) -> usize {
        self.flux.len_of(Axis(1))
    }

    pub fn is_point(&self) -> bool {
        matches!(self.shape, ComponentShape::Point)
    }

    pub fn is_gaussian(&self) -> bool {
        matches!(self.shape, ComponentShape::Gaussian { .. })
    }
}

/// A sky model: a list of images plus a list of components. Either list may
/// be empty, but a model that is empty on both sides predicts nothing and is
/// useless for calibration.
#[derive(Clone, Debug, Default)]
pub struct SkyModel {
    pub images: Vec<Image>,
    pub components: Vec<Skycomponent>,
}

impl SkyModel {
    pub fn from_components(components: Vec<Skycomponent>) -> SkyModel {
        SkyModel {
            images: vec![],
            components,
        }
    }

    pub fn from_image(image: Image) -> SkyModel {
        SkyModel {
            images: vec![image],
            components: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.components.is_empty()
    }
}
