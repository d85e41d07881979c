// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sky images and their facet decomposition.
//!
//! An [`Image`] is a 4-axis array `[channel][polarisation][y][x]` plus a
//! small geometry descriptor. Derived quantities (channel count, pixel
//! count, ...) are computed from the data, never stored redundantly.

mod error;

pub use error::ImageError;

use marlu::RADec;
use ndarray::prelude::*;
use vec1::Vec1;

/// The per-channel, per-polarisation sum of imaging weights that accompanies
/// a dirty image or PSF out of an invert.
pub type SumWeights = Array2<f64>;

/// Where an image's pixels sit on the sky: the tangent point, the pixel
/// scale, and (for facets) the offset of the image centre from the tangent
/// point in direction cosines.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageGeometry {
    /// The tangent point all (l, m) coordinates are relative to.
    pub phase_centre: RADec,

    /// The size of a pixel \[radians\].
    pub cellsize: f64,

    /// The frequency of each channel \[Hz\].
    pub frequency: Vec1<f64>,

    /// Direction-cosine offset of this image's centre pixel from the phase
    /// centre. Zero for a full image; non-zero for facets.
    pub offset_l: f64,
    pub offset_m: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// `[channel][polarisation][y][x]`.
    pub data: Array4<f64>,

    pub geometry: ImageGeometry,
}

impl Image {
    /// Construct an image, enforcing the channel-count and squareness
    /// invariants.
    pub fn new(data: Array4<f64>, geometry: ImageGeometry) -> Result<Image, ImageError> {
        let (nchan, _, ny, nx) = data.dim();
        if geometry.frequency.len() != nchan {
            return Err(ImageError::FrequencyCount {
                nchan,
                nfreq: geometry.frequency.len(),
            });
        }
        if ny != nx {
            return Err(ImageError::NotSquare { ny, nx });
        }
        Ok(Image { data, geometry })
    }

    /// An all-zero image.
    pub fn empty(
        npol: usize,
        npix: usize,
        phase_centre: RADec,
        cellsize: f64,
        frequency: Vec1<f64>,
    ) -> Image {
        let nchan = frequency.len();
        Image {
            data: Array4::zeros((nchan, npol, npix, npix)),
            geometry: ImageGeometry {
                phase_centre,
                cellsize,
                frequency,
                offset_l: 0.0,
                offset_m: 0.0,
            },
        }
    }

    pub fn nchan(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn npol(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// The image side length in pixels.
    pub fn npix(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// A copy of this image with all pixels set to zero.
    pub fn zeroed_copy(&self) -> Image {
        Image {
            data: Array4::zeros(self.data.dim()),
            geometry: self.geometry.clone(),
        }
    }

    /// The direction cosines of a pixel relative to the phase centre. The
    /// centre pixel (`npix/2` on both axes) sits at the geometry's offset.
    pub fn pixel_lm(&self, ix: usize, iy: usize) -> (f64, f64) {
        let centre = (self.npix() / 2) as f64;
        let l = self.geometry.offset_l + (ix as f64 - centre) * self.geometry.cellsize;
        let m = self.geometry.offset_m + (iy as f64 - centre) * self.geometry.cellsize;
        (l, m)
    }

    /// Split this image into `facets × facets` non-overlapping tiles, in
    /// row-major (y, then x) order. Each facet's geometry records its offset
    /// so that a facet pixel maps to the same sky position as the parent
    /// pixel it came from.
    pub fn scatter_facets(&self, facets: usize) -> Result<Vec<Image>, ImageError> {
        let npix = self.npix();
        if facets == 0 || npix % facets != 0 {
            return Err(ImageError::FacetDivision { npix, facets });
        }
        if facets == 1 {
            return Ok(vec![self.clone()]);
        }
        let fpix = npix / facets;
        let centre = (npix / 2) as f64;
        let fcentre = (fpix / 2) as f64;
        let mut out = Vec::with_capacity(facets * facets);
        for fy in 0..facets {
            for fx in 0..facets {
                let (y0, x0) = (fy * fpix, fx * fpix);
                let data = self
                    .data
                    .slice(s![.., .., y0..y0 + fpix, x0..x0 + fpix])
                    .to_owned();
                let geometry = ImageGeometry {
                    offset_l: self.geometry.offset_l
                        + (x0 as f64 + fcentre - centre) * self.geometry.cellsize,
                    offset_m: self.geometry.offset_m
                        + (y0 as f64 + fcentre - centre) * self.geometry.cellsize,
                    ..self.geometry.clone()
                };
                out.push(Image { data, geometry });
            }
        }
        Ok(out)
    }

    /// The inverse of [`Image::scatter_facets`]: place facet images back
    /// into a copy of this (template) image. Facets must be in row-major
    /// order and sized `npix/facets`.
    pub fn gather_facets(&self, facets: usize, parts: &[Image]) -> Result<Image, ImageError> {
        let npix = self.npix();
        if facets == 0 || npix % facets != 0 {
            return Err(ImageError::FacetDivision { npix, facets });
        }
        if parts.len() != facets * facets {
            return Err(ImageError::FacetCount {
                expected: facets * facets,
                got: parts.len(),
            });
        }
        let fpix = npix / facets;
        let mut out = self.zeroed_copy();
        for (k, part) in parts.iter().enumerate() {
            let expected = (self.nchan(), self.npol(), fpix, fpix);
            if part.data.dim() != expected {
                return Err(ImageError::ShapeMismatch {
                    lhs: expected,
                    rhs: part.data.dim(),
                });
            }
            let (fy, fx) = (k / facets, k % facets);
            let (y0, x0) = (fy * fpix, fx * fpix);
            out.data
                .slice_mut(s![.., .., y0..y0 + fpix, x0..x0 + fpix])
                .assign(&part.data);
        }
        Ok(out)
    }

    /// Accumulate `sumwt`-scaled pixels of another image into this one:
    /// `self[c,p] += other[c,p] * sumwt[c,p]`. Used when combining partial
    /// dirty images across partitions.
    pub fn scaled_accumulate(
        &mut self,
        other: &Image,
        sumwt: &SumWeights,
    ) -> Result<(), ImageError> {
        if self.data.dim() != other.data.dim() {
            return Err(ImageError::ShapeMismatch {
                lhs: self.data.dim(),
                rhs: other.data.dim(),
            });
        }
        if sumwt.dim() != (self.nchan(), self.npol()) {
            return Err(ImageError::WeightShape {
                got: sumwt.dim(),
                expected: (self.nchan(), self.npol()),
            });
        }
        for ((c, p), &w) in sumwt.indexed_iter() {
            self.data
                .slice_mut(s![c, p, .., ..])
                .scaled_add(w, &other.data.slice(s![c, p, .., ..]));
        }
        Ok(())
    }

    /// Divide each channel/polarisation plane by its sum of weights.
    /// Planes with no weight are left untouched.
    pub fn normalise(&mut self, sumwt: &SumWeights) -> Result<(), ImageError> {
        if sumwt.dim() != (self.nchan(), self.npol()) {
            return Err(ImageError::WeightShape {
                got: sumwt.dim(),
                expected: (self.nchan(), self.npol()),
            });
        }
        for ((c, p), &w) in sumwt.indexed_iter() {
            if w > 0.0 {
                self.data
                    .slice_mut(s![c, p, .., ..])
                    .mapv_inplace(|x| x / w);
            }
        }
        Ok(())
    }

    /// Summary statistics over the image pixels.
    pub fn qa(&self) -> ImageQa {
        let mut max = f64::MIN;
        let mut min = f64::MAX;
        let mut sum_sqr = 0.0;
        for &x in self.data.iter() {
            max = max.max(x);
            min = min.min(x);
            sum_sqr += x * x;
        }
        let n = self.data.len().max(1);
        ImageQa {
            max,
            min,
            rms: (sum_sqr / n as f64).sqrt(),
        }
    }
}

/// Quality-assessment summary of an image.
#[derive(Clone, Copy, Debug)]
pub struct ImageQa {
    pub max: f64,
    pub min: f64,
    pub rms: f64,
}
