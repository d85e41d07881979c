// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-antenna complex gains and their application to visibilities.

mod error;
#[cfg(test)]
mod tests;

pub use error::GainError;

use hifitime::{Duration, Epoch};
use itertools::Itertools;
use marlu::c64;
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{math::average_epoch, partition::Partitions, vis::Visibility};

/// Per-antenna, per-solution-interval complex gains. The `gain` array is
/// `[time][antenna][channel][polarisation]`. The forward sense is
/// model-to-data: a row's visibility is multiplied by
/// `g[antenna1] * conj(g[antenna2])`.
#[derive(Clone, Debug)]
pub struct GainTable {
    pub gain: Array4<c64>,

    /// The centroid of each solution interval.
    pub time: Vec1<Epoch>,

    /// The frequency of each gain channel \[Hz\].
    pub frequency: Vec1<f64>,
}

impl GainTable {
    pub fn ntime(&self) -> usize {
        self.gain.len_of(Axis(0))
    }

    pub fn nant(&self) -> usize {
        self.gain.len_of(Axis(1))
    }

    pub fn nchan(&self) -> usize {
        self.gain.len_of(Axis(2))
    }

    pub fn npol(&self) -> usize {
        self.gain.len_of(Axis(3))
    }

    /// The index of the solution interval closest to `t`.
    pub fn solution_index(&self, t: Epoch) -> usize {
        let times: Vec<f64> = self.time.iter().map(|e| e.to_gpst_seconds()).collect();
        crate::math::nearest_index(&times, t.to_gpst_seconds())
    }
}

/// Make a unity gain table shaped for `vis`. With a `timeslice`, the
/// dataset's unique timestamps are grouped into solution intervals of that
/// width; without one, every unique timestamp gets its own solution.
pub fn create_gaintable(
    vis: &Visibility,
    timeslice: Option<Duration>,
) -> Result<GainTable, GainError> {
    if vis.nrows() == 0 {
        return Err(GainError::NoRows);
    }

    let unique: Vec<Epoch> = vis
        .time
        .iter()
        .copied()
        .sorted_by(|a, b| a.to_gpst_seconds().total_cmp(&b.to_gpst_seconds()))
        .dedup()
        .collect();

    let solution_times: Vec<Epoch> = match timeslice {
        Some(width) => {
            let values: Vec<f64> = unique.iter().map(|e| e.to_gpst_seconds()).collect();
            // Pad the sweep so the final timestamp lands in a window.
            let start = values[0];
            let stop = values[values.len() - 1] + width.to_seconds();
            let cursor = crate::partition::PartitionCursor::new(start, stop, width.to_seconds());
            let mut times = vec![];
            for mask in Partitions::with_cursor(values, cursor) {
                times.push(average_epoch(mask.indices().map(|i| unique[i])));
            }
            times
        }
        None => unique,
    };

    let nant = vis
        .antenna1
        .iter()
        .chain(vis.antenna2.iter())
        .max()
        .copied()
        .expect("at least one row")
        + 1;

    Ok(GainTable {
        gain: Array4::from_elem(
            (solution_times.len(), nant, vis.nchan(), vis.npol()),
            c64::new(1.0, 0.0),
        ),
        time: Vec1::try_from_vec(solution_times).expect("at least one row"),
        frequency: vis.frequency.clone(),
    })
}

/// Apply (or, with `inverse`, undo) a gain table to a dataset, returning a
/// new dataset. A single-channel gain table is broadcast across the
/// dataset's channels. Inverting a zero gain zeroes the visibility and its
/// weight rather than dividing by zero.
pub fn apply_gaintable(
    vis: &Visibility,
    gains: &GainTable,
    inverse: bool,
) -> Result<Visibility, GainError> {
    if gains.nchan() != vis.nchan() && gains.nchan() != 1 {
        return Err(GainError::ChannelMismatch {
            gains: gains.nchan(),
            vis: vis.nchan(),
        });
    }
    if gains.npol() != vis.npol() {
        return Err(GainError::PolMismatch {
            gains: gains.npol(),
            vis: vis.npol(),
        });
    }

    let solution_times: Vec<f64> = gains.time.iter().map(|e| e.to_gpst_seconds()).collect();
    let mut out = vis.clone();
    for r in 0..vis.nrows() {
        let (a1, a2) = (vis.antenna1[r], vis.antenna2[r]);
        for (antenna, nant) in [(a1, gains.nant()), (a2, gains.nant())] {
            if antenna >= nant {
                return Err(GainError::AntennaOutOfRange {
                    row: r,
                    antenna,
                    nant,
                });
            }
        }
        let t = crate::math::nearest_index(&solution_times, vis.time[r].to_gpst_seconds());
        for c in 0..vis.nchan() {
            let gc = if gains.nchan() == 1 { 0 } else { c };
            for p in 0..vis.npol() {
                let factor =
                    gains.gain[[t, a1, gc, p]] * gains.gain[[t, a2, gc, p]].conj();
                if inverse {
                    if factor.norm_sqr() > 0.0 {
                        out.vis[[r, c, p]] /= factor;
                    } else {
                        out.vis[[r, c, p]] = c64::new(0.0, 0.0);
                        out.weight[[r, c, p]] = 0.0;
                        out.imaging_weight[[r, c, p]] = 0.0;
                    }
                } else {
                    out.vis[[r, c, p]] *= factor;
                }
            }
        }
    }
    Ok(out)
}
