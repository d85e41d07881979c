// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The in-memory visibility dataset and its row operations.
//!
//! A [`Visibility`] holds one observation with one set of frequencies and one
//! phase centre. Graph nodes treat a dataset as logically immutable; anything
//! that needs to mutate first takes its own copy (all the operations here
//! return new datasets).

mod error;
#[cfg(test)]
mod tests;

pub use error::VisError;

use hifitime::Epoch;
use marlu::{c64, RADec};
use ndarray::prelude::*;
use vec1::Vec1;

use crate::partition::PartitionMask;

/// A visibility dataset. The `vis` array is `[row][channel][polarisation]`;
/// `uvw` is `[row][3]` \[metres\]; all per-row columns share the row count.
#[derive(Clone, Debug)]
pub struct Visibility {
    /// Baseline coordinates \[metres\].
    pub uvw: Array2<f64>,

    /// The timestamp of each row.
    pub time: Vec<Epoch>,

    /// The first antenna of each row's baseline.
    pub antenna1: Vec<usize>,

    /// The second antenna of each row's baseline.
    pub antenna2: Vec<usize>,

    /// The complex visibilities.
    pub vis: Array3<c64>,

    /// Data weights; the same shape as `vis`.
    pub weight: Array3<f64>,

    /// Imaging weights (data weights with an imaging weighting scheme
    /// applied); the same shape as `vis`.
    pub imaging_weight: Array3<f64>,

    /// The frequency of each channel \[Hz\].
    pub frequency: Vec1<f64>,

    /// The phase centre of the observation.
    pub phase_centre: RADec,
}

impl Visibility {
    /// Construct a dataset, enforcing the shape invariants. If no imaging
    /// weights are given, the data weights are used.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uvw: Array2<f64>,
        time: Vec<Epoch>,
        antenna1: Vec<usize>,
        antenna2: Vec<usize>,
        vis: Array3<c64>,
        weight: Array3<f64>,
        imaging_weight: Option<Array3<f64>>,
        frequency: Vec1<f64>,
        phase_centre: RADec,
    ) -> Result<Visibility, VisError> {
        let rows = vis.len_of(Axis(0));
        if uvw.len_of(Axis(0)) != rows {
            return Err(VisError::RowCount {
                uvw_rows: uvw.len_of(Axis(0)),
                rows,
            });
        }
        if uvw.len_of(Axis(1)) != 3 {
            return Err(VisError::UvwColumns {
                got: uvw.len_of(Axis(1)),
            });
        }
        for (column, got) in [
            ("time", time.len()),
            ("antenna1", antenna1.len()),
            ("antenna2", antenna2.len()),
        ] {
            if got != rows {
                return Err(VisError::ColumnLength { column, got, rows });
            }
        }
        if weight.dim() != vis.dim() {
            return Err(VisError::WeightShape {
                weight: weight.dim(),
                vis: vis.dim(),
            });
        }
        let imaging_weight = imaging_weight.unwrap_or_else(|| weight.clone());
        if imaging_weight.dim() != vis.dim() {
            return Err(VisError::WeightShape {
                weight: imaging_weight.dim(),
                vis: vis.dim(),
            });
        }
        if frequency.len() != vis.len_of(Axis(1)) {
            return Err(VisError::FrequencyCount {
                nchan: vis.len_of(Axis(1)),
                nfreq: frequency.len(),
            });
        }

        Ok(Visibility {
            uvw,
            time,
            antenna1,
            antenna2,
            vis,
            weight,
            imaging_weight,
            frequency,
            phase_centre,
        })
    }

    pub fn nrows(&self) -> usize {
        self.vis.len_of(Axis(0))
    }

    pub fn nchan(&self) -> usize {
        self.vis.len_of(Axis(1))
    }

    pub fn npol(&self) -> usize {
        self.vis.len_of(Axis(2))
    }

    /// The row timestamps as GPS seconds.
    pub fn gpst_times(&self) -> Vec<f64> {
        self.time.iter().map(|e| e.to_gpst_seconds()).collect()
    }

    /// The w baseline coordinate of each row \[metres\].
    pub fn w_values(&self) -> Vec<f64> {
        self.uvw.column(2).to_vec()
    }

    /// A copy of this dataset with all visibilities set to zero.
    pub fn zeroed_copy(&self) -> Visibility {
        let mut out = self.clone();
        out.vis.fill(c64::new(0.0, 0.0));
        out
    }

    /// A copy of this dataset with all visibilities set to one. Useful as the
    /// model in gain solves against divided-out data.
    pub fn unit_model(&self) -> Visibility {
        let mut out = self.clone();
        out.vis.fill(c64::new(1.0, 0.0));
        out
    }

    pub(crate) fn check_same_shape(&self, other: &Visibility) -> Result<(), VisError> {
        if self.vis.dim() != other.vis.dim() {
            return Err(VisError::ShapeMismatch {
                lhs: self.vis.dim(),
                rhs: other.vis.dim(),
            });
        }
        Ok(())
    }

    /// Extract the rows selected by `mask` into a new dataset.
    pub fn select_rows(&self, mask: &PartitionMask) -> Result<Visibility, VisError> {
        if mask.len() != self.nrows() {
            return Err(VisError::MaskLength {
                mask: mask.len(),
                rows: self.nrows(),
            });
        }
        let indices: Vec<usize> = mask.indices().collect();
        Ok(Visibility {
            uvw: self.uvw.select(Axis(0), &indices),
            time: indices.iter().map(|&i| self.time[i]).collect(),
            antenna1: indices.iter().map(|&i| self.antenna1[i]).collect(),
            antenna2: indices.iter().map(|&i| self.antenna2[i]).collect(),
            vis: self.vis.select(Axis(0), &indices),
            weight: self.weight.select(Axis(0), &indices),
            imaging_weight: self.imaging_weight.select(Axis(0), &indices),
            frequency: self.frequency.clone(),
            phase_centre: self.phase_centre,
        })
    }

    /// Write the rows of `partition` back into the positions selected by
    /// `mask`. The inverse of [`Visibility::select_rows`]; together they
    /// preserve the original row order across a scatter/gather cycle.
    pub fn scatter_rows(
        &mut self,
        mask: &PartitionMask,
        partition: &Visibility,
    ) -> Result<(), VisError> {
        if mask.len() != self.nrows() {
            return Err(VisError::MaskLength {
                mask: mask.len(),
                rows: self.nrows(),
            });
        }
        let indices: Vec<usize> = mask.indices().collect();
        if indices.len() != partition.nrows() {
            return Err(VisError::ScatterRows {
                got: partition.nrows(),
                expected: indices.len(),
            });
        }
        for (k, &r) in indices.iter().enumerate() {
            self.vis
                .slice_mut(s![r, .., ..])
                .assign(&partition.vis.slice(s![k, .., ..]));
            self.weight
                .slice_mut(s![r, .., ..])
                .assign(&partition.weight.slice(s![k, .., ..]));
            self.imaging_weight
                .slice_mut(s![r, .., ..])
                .assign(&partition.imaging_weight.slice(s![k, .., ..]));
        }
        Ok(())
    }

    /// `self − other`, element-wise over the visibilities.
    pub fn subtract(&self, other: &Visibility) -> Result<Visibility, VisError> {
        self.check_same_shape(other)?;
        let mut out = self.clone();
        out.vis = &self.vis - &other.vis;
        Ok(out)
    }

    /// Accumulate another dataset's visibilities into this one. Used to sum
    /// partial model predictions.
    pub fn accumulate(&mut self, other: &Visibility) -> Result<(), VisError> {
        self.check_same_shape(other)?;
        self.vis += &other.vis;
        Ok(())
    }

    /// Divide these visibilities by a model, point-wise and weighted: the
    /// result's visibilities are `v m* / |m|²` and its weights are
    /// `w |m|²`. Rows where the model is zero get zero weight.
    pub fn divide(&self, model: &Visibility) -> Result<Visibility, VisError> {
        self.check_same_shape(model)?;
        let mut out = self.clone();
        azip!((o in &mut out.vis, ow in &mut out.weight, oiw in &mut out.imaging_weight, &m in &model.vis) {
            let norm = m.norm_sqr();
            if norm > 0.0 {
                *o *= m.conj() / norm;
                *ow *= norm;
                *oiw *= norm;
            } else {
                *o = c64::new(0.0, 0.0);
                *ow = 0.0;
                *oiw = 0.0;
            }
        });
        Ok(out)
    }

    /// Weighted-average all channels into a single channel.
    pub fn integrate_channels(&self) -> Visibility {
        let (rows, _, npol) = self.vis.dim();
        let mut vis = Array3::from_elem((rows, 1, npol), c64::new(0.0, 0.0));
        let mut weight = Array3::zeros((rows, 1, npol));
        let mut imaging_weight = Array3::zeros((rows, 1, npol));
        for r in 0..rows {
            for p in 0..npol {
                let mut acc = c64::new(0.0, 0.0);
                let mut wsum = 0.0;
                let mut iwsum = 0.0;
                for c in 0..self.nchan() {
                    let w = self.weight[[r, c, p]];
                    acc += self.vis[[r, c, p]] * w;
                    wsum += w;
                    iwsum += self.imaging_weight[[r, c, p]];
                }
                if wsum > 0.0 {
                    vis[[r, 0, p]] = acc / wsum;
                }
                weight[[r, 0, p]] = wsum;
                imaging_weight[[r, 0, p]] = iwsum;
            }
        }
        let mean_freq = self.frequency.iter().sum::<f64>() / self.frequency.len() as f64;
        Visibility {
            uvw: self.uvw.clone(),
            time: self.time.clone(),
            antenna1: self.antenna1.clone(),
            antenna2: self.antenna2.clone(),
            vis,
            weight,
            imaging_weight,
            frequency: Vec1::new(mean_freq),
            phase_centre: self.phase_centre,
        }
    }

    /// Gather channel-partitioned datasets (same rows, different frequencies)
    /// into a single dataset, concatenating along the channel axis.
    pub fn gather_channels(datasets: &[Visibility]) -> Result<Visibility, VisError> {
        let first = datasets.first().ok_or(VisError::EmptyGather)?;
        let mut frequency = vec![];
        for ds in datasets {
            if ds.nrows() != first.nrows() {
                return Err(VisError::GatherRows {
                    lhs: first.nrows(),
                    rhs: ds.nrows(),
                });
            }
            frequency.extend(ds.frequency.iter().copied());
        }
        let vis_views: Vec<_> = datasets.iter().map(|ds| ds.vis.view()).collect();
        let weight_views: Vec<_> = datasets.iter().map(|ds| ds.weight.view()).collect();
        let imaging_views: Vec<_> = datasets.iter().map(|ds| ds.imaging_weight.view()).collect();
        // Concatenation along the channel axis can only fail if the row or
        // polarisation counts disagree.
        let vis = ndarray::concatenate(Axis(1), &vis_views).map_err(|_| VisError::ShapeMismatch {
            lhs: first.vis.dim(),
            rhs: datasets.last().expect("not empty").vis.dim(),
        })?;
        let weight = ndarray::concatenate(Axis(1), &weight_views).map_err(|_| {
            VisError::ShapeMismatch {
                lhs: first.vis.dim(),
                rhs: datasets.last().expect("not empty").vis.dim(),
            }
        })?;
        let imaging_weight = ndarray::concatenate(Axis(1), &imaging_views).map_err(|_| {
            VisError::ShapeMismatch {
                lhs: first.vis.dim(),
                rhs: datasets.last().expect("not empty").vis.dim(),
            }
        })?;
        Ok(Visibility {
            uvw: first.uvw.clone(),
            time: first.time.clone(),
            antenna1: first.antenna1.clone(),
            antenna2: first.antenna2.clone(),
            vis,
            weight,
            imaging_weight,
            frequency: Vec1::try_from_vec(frequency).expect("at least one dataset"),
            phase_centre: first.phase_centre,
        })
    }

    /// Summary statistics over the visibility amplitudes.
    pub fn qa(&self) -> VisQa {
        let mut max_abs = f64::MIN;
        let mut min_abs = f64::MAX;
        let mut sum_sqr = 0.0;
        for v in self.vis.iter() {
            let a = v.norm();
            max_abs = max_abs.max(a);
            min_abs = min_abs.min(a);
            sum_sqr += a * a;
        }
        let n = self.vis.len().max(1);
        VisQa {
            max_abs,
            min_abs,
            rms: (sum_sqr / n as f64).sqrt(),
        }
    }
}

/// Quality-assessment summary of a visibility dataset.
#[derive(Clone, Copy, Debug)]
pub struct VisQa {
    pub max_abs: f64,
    pub min_abs: f64,
    pub rms: f64,
}
