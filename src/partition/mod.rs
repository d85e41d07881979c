// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Row partitioning of visibility datasets.
//!
//! A dataset is split into independent row subsets by sliding a half-open
//! window of fixed width along a per-row axis (time, or the w baseline
//! coordinate). Each step yields a boolean [`PartitionMask`] selecting the
//! rows inside the window; empty windows are skipped without yielding. The
//! cursor state is an explicit value type driving a pure `advance`, so a
//! sequence is restartable and two sequences never share state.


use hifitime::Duration;

use crate::vis::Visibility;

/// A boolean row-selection mask: true where a row belongs to the partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionMask(Vec<bool>);

impl PartitionMask {
    /// A mask selecting every one of `rows` rows.
    pub fn full(rows: usize) -> PartitionMask {
        PartitionMask(vec![true; rows])
    }

    pub fn from_bools(mask: Vec<bool>) -> PartitionMask {
        PartitionMask(mask)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How many rows this mask selects.
    pub fn num_selected(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Does this mask select any rows at all?
    pub fn any(&self) -> bool {
        self.0.iter().any(|&b| b)
    }

    /// The indices of the selected rows, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// The state of a partitioning sweep: a window of `width` centred on
/// `cursor`, advanced by exactly one width per step until `cursor` reaches
/// `stop`. The window is half-open, `[cursor - width/2, cursor + width/2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartitionCursor {
    pub start: f64,
    pub stop: f64,
    pub cursor: f64,
    pub width: f64,
}

impl PartitionCursor {
    pub fn new(start: f64, stop: f64, width: f64) -> PartitionCursor {
        PartitionCursor {
            start,
            stop,
            cursor: start,
            width,
        }
    }

    /// Take one step: select the rows of `values` inside the current window
    /// and advance. Empty windows are skipped without yielding. `None` means
    /// the axis is exhausted; this is clean termination, not an error.
    pub fn advance(mut self, values: &[f64]) -> Option<(PartitionMask, PartitionCursor)> {
        if !(self.width > 0.0) || !self.width.is_finite() {
            return None;
        }
        while self.cursor < self.stop {
            let lo = self.cursor - self.width / 2.0;
            let hi = self.cursor + self.width / 2.0;
            let mask: Vec<bool> = values.iter().map(|&v| v >= lo && v < hi).collect();
            self.cursor += self.width;
            if mask.iter().any(|&b| b) {
                return Some((PartitionMask(mask), self));
            }
        }
        None
    }
}

/// A lazy, finite sequence of [`PartitionMask`]s over one per-row axis.
///
/// The axis values are copied at construction, so mutating the originating
/// dataset afterwards does not affect the partitioning. Cloning (or
/// [`Partitions::restart`]ing) gives an independent sequence from the start.
#[derive(Clone, Debug)]
pub struct Partitions {
    values: Vec<f64>,
    initial: Option<PartitionCursor>,
    state: Option<PartitionCursor>,
}

impl Partitions {
    /// Partition over arbitrary axis values with windows of `width`. This is
    /// the general form, also usable for per-channel frequency partitioning.
    /// The sweep covers `[min(values), max(values))`; rows at exactly
    /// `max(values)` fall outside the final half-open window.
    pub fn over_values(values: Vec<f64>, width: f64) -> Partitions {
        let initial = match (
            values.iter().cloned().reduce(f64::min),
            values.iter().cloned().reduce(f64::max),
        ) {
            (Some(start), Some(stop)) => Some(PartitionCursor::new(start, stop, width)),
            _ => None,
        };
        Partitions {
            values,
            initial,
            state: initial,
        }
    }

    /// Partition over arbitrary axis values with an explicit cursor, e.g. to
    /// pad `stop` past `max(values)` so the topmost rows are covered.
    pub fn with_cursor(values: Vec<f64>, cursor: PartitionCursor) -> Partitions {
        Partitions {
            values,
            initial: Some(cursor),
            state: Some(cursor),
        }
    }

    /// Time-slice a dataset into windows of `timeslice` width.
    pub fn by_time(vis: &Visibility, timeslice: Duration) -> Partitions {
        Partitions::over_values(vis.gpst_times(), timeslice.to_seconds())
    }

    /// Partition a dataset along the w baseline coordinate into planes of
    /// `w_width` \[metres\].
    pub fn by_w(vis: &Visibility, w_width: f64) -> Partitions {
        Partitions::over_values(vis.w_values(), w_width)
    }

    /// Reset the sweep back to its start.
    pub fn restart(&mut self) {
        self.state = self.initial;
    }
}

impl Iterator for Partitions {
    type Item = PartitionMask;

    fn next(&mut self) -> Option<PartitionMask> {
        let state = self.state.take()?;
        match state.advance(&self.values) {
            Some((mask, next_state)) => {
                self.state = Some(next_state);
                Some(mask)
            }
            None => None,
        }
    }
}
