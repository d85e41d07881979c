// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The numerical imaging operators behind the orchestration layer.
//!
//! The graph composer only needs the [`Imager`] trait: predict (model image
//! to visibility) and invert (visibility to dirty image or PSF plus a sum of
//! weights), both partition-local and side-effect-free. [`DftImager`] is a
//! direct-Fourier reference implementation with an exact w term; it is slow
//! on purpose and exists so the composition and calibration machinery can be
//! exercised end-to-end without an external gridder.

mod error;
#[cfg(test)]
mod tests;

pub use error::ImagingError;

use std::f64::consts::{FRAC_PI_2, LN_2, TAU};

use marlu::c64;
use ndarray::prelude::*;
use num_traits::Zero;
use rayon::prelude::*;

use crate::{
    constants::VEL_C,
    image::{Image, SumWeights},
    srclist::{ComponentShape, Skycomponent},
    vis::Visibility,
};

const GAUSSIAN_EXP_CONST: f64 = -(FRAC_PI_2 * FRAC_PI_2) / LN_2;

/// A partition-local imaging operator pair.
pub trait Imager: Send + Sync {
    /// Predict model visibilities for `vis`'s rows from an image. The
    /// returned dataset has the same rows/channels/polarisations as `vis`
    /// with the model in its `vis` column.
    fn predict(&self, vis: &Visibility, model: &Image) -> Result<Visibility, ImagingError>;

    /// Make a dirty image (or, with `dopsf`, the point-spread function) on
    /// `template`'s grid, along with the sum of imaging weights per channel
    /// and polarisation.
    fn invert(
        &self,
        vis: &Visibility,
        template: &Image,
        dopsf: bool,
    ) -> Result<(Image, SumWeights), ImagingError>;
}

/// Direct-Fourier-transform imaging. Exact (no gridding approximations, the
/// w term handled exactly), at O(rows × pixels) cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct DftImager;

fn check_image(vis: &Visibility, image: &Image) -> Result<(), ImagingError> {
    if image.nchan() != vis.nchan() {
        return Err(ImagingError::ChannelMismatch {
            image: image.nchan(),
            vis: vis.nchan(),
        });
    }
    if image.npol() != vis.npol() {
        return Err(ImagingError::PolMismatch {
            image: image.npol(),
            vis: vis.npol(),
        });
    }
    Ok(())
}

impl Imager for DftImager {
    fn predict(&self, vis: &Visibility, model: &Image) -> Result<Visibility, ImagingError> {
        check_image(vis, model)?;
        let npix = model.npix();
        let mut out = vis.zeroed_copy();
        out.vis
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(r, mut vis_cp)| {
                for (c, &freq) in vis.frequency.iter().enumerate() {
                    let scale = freq / VEL_C;
                    let u = vis.uvw[[r, 0]] * scale;
                    let v = vis.uvw[[r, 1]] * scale;
                    let w = vis.uvw[[r, 2]] * scale;
                    for iy in 0..npix {
                        for ix in 0..npix {
                            let (l, m) = model.pixel_lm(ix, iy);
                            let r2 = l * l + m * m;
                            if r2 >= 1.0 {
                                continue;
                            }
                            let n_minus_1 = (1.0 - r2).sqrt() - 1.0;
                            let phasor = c64::cis(TAU * (u * l + v * m + w * n_minus_1));
                            for p in 0..vis.npol() {
                                let flux = model.data[[c, p, iy, ix]];
                                if flux != 0.0 {
                                    vis_cp[[c, p]] += phasor * flux;
                                }
                            }
                        }
                    }
                }
            });
        Ok(out)
    }

    fn invert(
        &self,
        vis: &Visibility,
        template: &Image,
        dopsf: bool,
    ) -> Result<(Image, SumWeights), ImagingError> {
        check_image(vis, template)?;
        let npix = template.npix();
        let (nchan, npol) = (vis.nchan(), vis.npol());

        let mut sumwt: SumWeights = Array2::zeros((nchan, npol));
        for r in 0..vis.nrows() {
            for c in 0..nchan {
                for p in 0..npol {
                    sumwt[[c, p]] += vis.imaging_weight[[r, c, p]];
                }
            }
        }

        let mut image = template.zeroed_copy();
        // y axis of the image.
        image
            .data
            .axis_iter_mut(Axis(2))
            .into_par_iter()
            .enumerate()
            .for_each(|(iy, mut plane_cpx)| {
                for ix in 0..npix {
                    let (l, m) = template.pixel_lm(ix, iy);
                    let r2 = l * l + m * m;
                    if r2 >= 1.0 {
                        continue;
                    }
                    let n_minus_1 = (1.0 - r2).sqrt() - 1.0;
                    for r in 0..vis.nrows() {
                        for (c, &freq) in vis.frequency.iter().enumerate() {
                            let scale = freq / VEL_C;
                            let u = vis.uvw[[r, 0]] * scale;
                            let v = vis.uvw[[r, 1]] * scale;
                            let w = vis.uvw[[r, 2]] * scale;
                            let phasor = c64::cis(-TAU * (u * l + v * m + w * n_minus_1));
                            for p in 0..npol {
                                let weight = vis.imaging_weight[[r, c, p]];
                                if weight == 0.0 {
                                    continue;
                                }
                                let value = if dopsf {
                                    c64::new(1.0, 0.0)
                                } else {
                                    vis.vis[[r, c, p]]
                                };
                                plane_cpx[[c, p, ix]] += weight * (value * phasor).re;
                            }
                        }
                    }
                }
            });

        image
            .normalise(&sumwt)
            .expect("sum of weights was built to match the image");
        Ok((image, sumwt))
    }
}

/// The phase factors of one component towards every (row, channel) of a
/// dataset, Gaussian envelope included. The visibility contribution of the
/// component is `flux[chan][pol] * phasor[row][chan]`.
pub(crate) fn component_phasors(
    vis: &Visibility,
    comp: &Skycomponent,
) -> Result<Array2<c64>, ImagingError> {
    if comp.nchan() != vis.nchan() {
        return Err(ImagingError::ComponentChannels {
            name: comp.name.clone(),
            component: comp.nchan(),
            vis: vis.nchan(),
        });
    }
    if comp.npol() != vis.npol() {
        return Err(ImagingError::ComponentPols {
            name: comp.name.clone(),
            component: comp.npol(),
            vis: vis.npol(),
        });
    }

    let lmn = comp.direction.to_lmn(vis.phase_centre).prepare_for_rime();
    let mut phasors = Array2::from_elem((vis.nrows(), vis.nchan()), c64::zero());
    phasors
        .outer_iter_mut()
        .into_par_iter()
        .enumerate()
        .for_each(|(r, mut row)| {
            for (c, &freq) in vis.frequency.iter().enumerate() {
                let scale = freq / VEL_C;
                let u = vis.uvw[[r, 0]] * scale;
                let v = vis.uvw[[r, 1]] * scale;
                let w = vis.uvw[[r, 2]] * scale;
                let mut phasor = c64::cis(u * lmn.l + v * lmn.m + w * lmn.n);
                if let ComponentShape::Gaussian { maj, min, pa } = comp.shape {
                    let (s_pa, c_pa) = pa.sin_cos();
                    let k_x = u * s_pa + v * c_pa;
                    let k_y = u * c_pa - v * s_pa;
                    phasor *= (GAUSSIAN_EXP_CONST
                        * (maj.powi(2) * k_x.powi(2) + min.powi(2) * k_y.powi(2)))
                    .exp();
                }
                row[c] = phasor;
            }
        });
    Ok(phasors)
}

/// Predict the visibilities of a list of sky-model components into a zeroed
/// copy of `vis`.
pub fn predict_components(
    vis: &Visibility,
    comps: &[Skycomponent],
) -> Result<Visibility, ImagingError> {
    let mut out = vis.zeroed_copy();
    for comp in comps {
        let phasors = component_phasors(vis, comp)?;
        for r in 0..vis.nrows() {
            for c in 0..vis.nchan() {
                let phasor = phasors[[r, c]];
                for p in 0..vis.npol() {
                    out.vis[[r, c, p]] += phasor * comp.flux[[c, p]];
                }
            }
        }
    }
    Ok(out)
}
