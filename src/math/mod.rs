// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use hifitime::Epoch;

/// Average an iterator of [`Epoch`]s. The iterator must not be empty.
pub(crate) fn average_epoch<I: IntoIterator<Item = Epoch>>(es: I) -> Epoch {
    let mut count = 0;
    let sum = es.into_iter().fold(0.0, |acc, e| {
        count += 1;
        acc + e.to_gpst_seconds()
    });
    Epoch::from_gpst_seconds(sum / count as f64)
}

/// The index of the element of `sorted` (ascending) closest to `value`.
/// `sorted` must not be empty.
pub(crate) fn nearest_index(sorted: &[f64], value: f64) -> usize {
    debug_assert!(!sorted.is_empty());
    let i = sorted.partition_point(|&x| x < value);
    if i == 0 {
        0
    } else if i == sorted.len() {
        sorted.len() - 1
    } else if (value - sorted[i - 1]).abs() <= (sorted[i] - value).abs() {
        i - 1
    } else {
        i
    }
}
