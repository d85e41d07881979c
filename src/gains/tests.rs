// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use hifitime::{Duration, Epoch};
use marlu::c64;

use super::*;
use crate::tests::{synthetic_dataset, TEST_START_GPST};

#[test]
fn test_create_gaintable_shapes() {
    let vis = synthetic_dataset(4, 3, 2);
    let gains = create_gaintable(&vis, None).unwrap();
    // One solution per unique timestamp.
    assert_eq!(gains.ntime(), 4);
    assert_eq!(gains.nant(), 3);
    assert_eq!(gains.nchan(), vis.nchan());
    assert_eq!(gains.npol(), vis.npol());
    assert!(gains.gain.iter().all(|g| *g == c64::new(1.0, 0.0)));
}

#[test]
fn test_create_gaintable_with_solution_interval() {
    let vis = synthetic_dataset(4, 3, 1);
    // Timestamps are 10 s apart; 25 s windows pair them up.
    let gains = create_gaintable(&vis, Some(Duration::from_seconds(25.0))).unwrap();
    assert_eq!(gains.ntime(), 2);

    // The solution centroids are the average of each pair.
    assert_abs_diff_eq!(
        gains.time[0].to_gpst_seconds(),
        TEST_START_GPST + 5.0,
        epsilon = 1e-6
    );
}

#[test]
fn test_create_gaintable_rejects_empty() {
    let mut vis = synthetic_dataset(1, 3, 1);
    vis = vis
        .select_rows(&crate::partition::PartitionMask::from_bools(vec![
            false;
            vis.nrows()
        ]))
        .unwrap();
    assert!(matches!(
        create_gaintable(&vis, None),
        Err(GainError::NoRows)
    ));
}

#[test]
fn test_solution_index_picks_nearest() {
    let vis = synthetic_dataset(3, 3, 1);
    let gains = create_gaintable(&vis, None).unwrap();
    let t = Epoch::from_gpst_seconds(TEST_START_GPST + 11.0);
    assert_eq!(gains.solution_index(t), 1);
    let t = Epoch::from_gpst_seconds(TEST_START_GPST - 100.0);
    assert_eq!(gains.solution_index(t), 0);
}

#[test]
fn test_apply_then_inverse_round_trips() {
    let mut vis = synthetic_dataset(2, 4, 2);
    vis.vis.fill(c64::new(1.0, -0.5));

    let mut gains = create_gaintable(&vis, None).unwrap();
    for (i, g) in gains.gain.iter_mut().enumerate() {
        *g = c64::new(1.0 + 0.05 * (i % 7) as f64, 0.02 * (i % 5) as f64);
    }

    let corrupted = apply_gaintable(&vis, &gains, false).unwrap();
    let restored = apply_gaintable(&corrupted, &gains, true).unwrap();
    for (a, b) in vis.vis.iter().zip(restored.vis.iter()) {
        assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
        assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
    }
}

#[test]
fn test_inverse_of_zero_gain_zeroes_data_and_weight() {
    let mut vis = synthetic_dataset(1, 3, 1);
    vis.vis.fill(c64::new(1.0, 0.0));
    let mut gains = create_gaintable(&vis, None).unwrap();
    gains.gain.fill(c64::new(0.0, 0.0));

    let restored = apply_gaintable(&vis, &gains, true).unwrap();
    assert!(restored.vis.iter().all(|v| v.norm() == 0.0));
    assert!(restored.weight.iter().all(|&w| w == 0.0));
}

#[test]
fn test_single_channel_table_broadcasts() {
    let vis = synthetic_dataset(1, 3, 1);
    let integrated = vis.integrate_channels();
    let gains = create_gaintable(&integrated, None).unwrap();
    assert_eq!(gains.nchan(), 1);
    // Applying a 1-channel table to a 2-channel dataset is allowed.
    apply_gaintable(&vis, &gains, false).unwrap();
}

#[test]
fn test_apply_rejects_mismatched_pols() {
    let vis = synthetic_dataset(1, 3, 2);
    let single_pol = synthetic_dataset(1, 3, 1);
    let gains = create_gaintable(&single_pol, None).unwrap();
    assert!(matches!(
        apply_gaintable(&vis, &gains, false),
        Err(GainError::PolMismatch { .. })
    ));
}
