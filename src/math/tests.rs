// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use hifitime::Epoch;

use super::*;

#[test]
fn test_average_epoch() {
    let epochs = [
        Epoch::from_gpst_seconds(1065880128.0),
        Epoch::from_gpst_seconds(1065880130.0),
        Epoch::from_gpst_seconds(1065880132.0),
    ];
    let average = average_epoch(epochs);
    assert_abs_diff_eq!(average.to_gpst_seconds(), 1065880130.0);
}

#[test]
fn test_nearest_index() {
    let sorted = [0.0, 1.0, 4.0, 9.0];
    assert_eq!(nearest_index(&sorted, -5.0), 0);
    assert_eq!(nearest_index(&sorted, 0.4), 0);
    assert_eq!(nearest_index(&sorted, 0.6), 1);
    assert_eq!(nearest_index(&sorted, 4.0), 2);
    assert_eq!(nearest_index(&sorted, 100.0), 3);
}
