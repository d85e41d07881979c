// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use marlu::c64;
use ndarray::prelude::*;

use super::*;
use crate::partition::PartitionMask;
use crate::tests::synthetic_dataset;

#[test]
fn test_new_rejects_bad_shapes() {
    let good = synthetic_dataset(2, 3, 2);

    let result = Visibility::new(
        good.uvw.slice(s![..2, ..]).to_owned(),
        good.time.clone(),
        good.antenna1.clone(),
        good.antenna2.clone(),
        good.vis.clone(),
        good.weight.clone(),
        None,
        good.frequency.clone(),
        good.phase_centre,
    );
    assert!(matches!(result, Err(VisError::RowCount { .. })));

    let result = Visibility::new(
        good.uvw.clone(),
        good.time.clone(),
        good.antenna1.clone(),
        good.antenna2.clone(),
        good.vis.clone(),
        good.weight.slice(s![.., ..1, ..]).to_owned(),
        None,
        good.frequency.clone(),
        good.phase_centre,
    );
    assert!(matches!(result, Err(VisError::WeightShape { .. })));

    let mut short_time = good.time.clone();
    short_time.pop();
    let result = Visibility::new(
        good.uvw.clone(),
        short_time,
        good.antenna1.clone(),
        good.antenna2.clone(),
        good.vis.clone(),
        good.weight.clone(),
        None,
        good.frequency.clone(),
        good.phase_centre,
    );
    assert!(matches!(
        result,
        Err(VisError::ColumnLength { column: "time", .. })
    ));
}

#[test]
fn test_select_then_scatter_preserves_row_order() {
    let mut vis = synthetic_dataset(3, 3, 1);
    // Tag each row with a distinct value.
    for (r, mut row) in vis.vis.outer_iter_mut().enumerate() {
        row.fill(c64::new(r as f64, -(r as f64)));
    }

    let mask = PartitionMask::from_bools(
        (0..vis.nrows()).map(|r| r % 3 == 1).collect(),
    );
    let part = vis.select_rows(&mask).unwrap();
    assert_eq!(part.nrows(), mask.num_selected());

    let mut rebuilt = vis.zeroed_copy();
    rebuilt.scatter_rows(&mask, &part).unwrap();
    for (r, row) in rebuilt.vis.outer_iter().enumerate() {
        let expected = if r % 3 == 1 { r as f64 } else { 0.0 };
        assert_abs_diff_eq!(row[[0, 0]].re, expected);
    }
}

#[test]
fn test_scatter_rejects_mismatched_partition() {
    let mut vis = synthetic_dataset(2, 3, 1);
    let mask = PartitionMask::full(vis.nrows());
    let part = synthetic_dataset(1, 3, 1);
    assert!(matches!(
        vis.scatter_rows(&mask, &part),
        Err(VisError::ScatterRows { .. })
    ));
}

#[test]
fn test_subtract_and_accumulate() {
    let mut a = synthetic_dataset(2, 3, 1);
    a.vis.fill(c64::new(3.0, 1.0));
    let mut b = a.clone();
    b.vis.fill(c64::new(1.0, 1.0));

    let diff = a.subtract(&b).unwrap();
    assert_abs_diff_eq!(diff.vis[[0, 0, 0]].re, 2.0);
    assert_abs_diff_eq!(diff.vis[[0, 0, 0]].im, 0.0);

    let mut acc = a.clone();
    acc.accumulate(&b).unwrap();
    assert_abs_diff_eq!(acc.vis[[0, 0, 0]].re, 4.0);
}

#[test]
fn test_divide_weights_by_model_power() {
    let mut data = synthetic_dataset(1, 3, 1);
    data.vis.fill(c64::new(4.0, 0.0));
    let mut model = data.clone();
    model.vis.fill(c64::new(2.0, 0.0));

    let divided = data.divide(&model).unwrap();
    assert_abs_diff_eq!(divided.vis[[0, 0, 0]].re, 2.0);
    assert_abs_diff_eq!(divided.weight[[0, 0, 0]], 4.0);

    // A zero model zeroes the quotient and its weight.
    model.vis.fill(c64::new(0.0, 0.0));
    let divided = data.divide(&model).unwrap();
    assert_abs_diff_eq!(divided.vis[[0, 0, 0]].norm(), 0.0);
    assert_abs_diff_eq!(divided.weight[[0, 0, 0]], 0.0);
}

#[test]
fn test_integrate_channels_is_weighted() {
    let mut vis = synthetic_dataset(1, 3, 1);
    vis.vis.slice_mut(s![.., 0, ..]).fill(c64::new(1.0, 0.0));
    vis.vis.slice_mut(s![.., 1, ..]).fill(c64::new(3.0, 0.0));
    vis.weight.slice_mut(s![.., 0, ..]).fill(3.0);
    vis.weight.slice_mut(s![.., 1, ..]).fill(1.0);

    let integrated = vis.integrate_channels();
    assert_eq!(integrated.nchan(), 1);
    // (1*3 + 3*1) / 4
    assert_abs_diff_eq!(integrated.vis[[0, 0, 0]].re, 1.5);
    assert_abs_diff_eq!(integrated.weight[[0, 0, 0]], 4.0);
}

#[test]
fn test_gather_channels() {
    let a = synthetic_dataset(1, 3, 1);
    let b = synthetic_dataset(1, 3, 1);
    let gathered = Visibility::gather_channels(&[a.clone(), b]).unwrap();
    assert_eq!(gathered.nchan(), 2 * a.nchan());
    assert_eq!(gathered.frequency.len(), 2 * a.nchan());
    assert_eq!(gathered.nrows(), a.nrows());

    assert!(matches!(
        Visibility::gather_channels(&[]),
        Err(VisError::EmptyGather)
    ));
}

#[test]
fn test_qa() {
    let mut vis = synthetic_dataset(1, 3, 1);
    vis.vis.fill(c64::new(3.0, 4.0));
    let qa = vis.qa();
    assert_abs_diff_eq!(qa.max_abs, 5.0);
    assert_abs_diff_eq!(qa.min_abs, 5.0);
    assert_abs_diff_eq!(qa.rms, 5.0);
}
