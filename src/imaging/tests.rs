// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use marlu::RADec;
use ndarray::prelude::*;
use vec1::vec1;

use super::*;
use crate::{
    srclist::Skycomponent,
    tests::{offset_point, synthetic_dataset, test_image, test_phase_centre},
};

#[test]
fn test_component_at_phase_centre_has_unit_phasor() {
    let vis = synthetic_dataset(2, 4, 1);
    let comp = offset_point("centre", 2.5, 0.0, 1);
    let predicted = predict_components(&vis, &[comp]).unwrap();
    // At the phase centre l = m = 0, so every visibility is just the flux.
    for v in predicted.vis.iter() {
        assert_abs_diff_eq!(v.re, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_offset_component_modulates_phase() {
    let vis = synthetic_dataset(1, 3, 1);
    let comp = offset_point("offset", 1.0, 0.05, 1);
    let predicted = predict_components(&vis, &[comp]).unwrap();
    // Amplitudes are preserved for a point source; phases are not all zero.
    for v in predicted.vis.iter() {
        assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-12);
    }
    assert!(predicted.vis.iter().any(|v| v.im.abs() > 1e-6));
}

#[test]
fn test_gaussian_envelope_attenuates() {
    let vis = synthetic_dataset(1, 3, 1);
    let point = offset_point("p", 1.0, 0.05, 1);
    let gaussian = Skycomponent {
        shape: crate::srclist::ComponentShape::Gaussian {
            maj: 2e-3,
            min: 1e-3,
            pa: 0.5,
        },
        ..point.clone()
    };
    let point_vis = predict_components(&vis, &[point]).unwrap();
    let gaussian_vis = predict_components(&vis, &[gaussian]).unwrap();
    for (p, g) in point_vis.vis.iter().zip(gaussian_vis.vis.iter()) {
        assert!(g.norm() < p.norm());
        assert!(g.norm() > 0.0);
    }
}

#[test]
fn test_component_channel_mismatch_is_eager() {
    let vis = synthetic_dataset(1, 3, 1);
    let comp = Skycomponent::new(
        "narrow".to_string(),
        test_phase_centre(),
        vec1![150e6],
        Array2::ones((1, 1)),
        crate::srclist::ComponentShape::Point,
    )
    .unwrap();
    assert!(matches!(
        predict_components(&vis, &[comp]),
        Err(ImagingError::ComponentChannels { .. })
    ));
}

#[test]
fn test_predict_image_matches_equivalent_component() {
    let vis = synthetic_dataset(1, 4, 1);
    // A single lit pixel at the image centre is a point source at the phase
    // centre.
    let mut model = test_image(1, 8);
    model.data.slice_mut(s![.., .., 4, 4]).fill(3.0);

    let imager = DftImager;
    let from_image = imager.predict(&vis, &model).unwrap();
    let from_component = predict_components(&vis, &[offset_point("c", 3.0, 0.0, 1)]).unwrap();

    for (a, b) in from_image.vis.iter().zip(from_component.vis.iter()) {
        assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
        assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
    }
}

#[test]
fn test_psf_peaks_at_unity_on_centre() {
    let mut vis = synthetic_dataset(1, 4, 1);
    vis.vis.fill(marlu::c64::new(123.0, 0.0));
    let template = test_image(1, 8);
    let imager = DftImager;
    let (psf, sumwt) = imager.invert(&vis, &template, true).unwrap();
    // The PSF ignores the data and is normalised to its centre.
    assert_abs_diff_eq!(psf.data[[0, 0, 4, 4]], 1.0, epsilon = 1e-12);
    assert!(psf.data.iter().all(|&x| x <= 1.0 + 1e-12));
    assert_abs_diff_eq!(sumwt[[0, 0]], vis.nrows() as f64);
}

#[test]
fn test_invert_centre_source_peaks_at_centre() {
    let vis = synthetic_dataset(2, 4, 1);
    let observed = predict_components(&vis, &[offset_point("c", 2.0, 0.0, 1)]).unwrap();
    let template = test_image(1, 8);
    let imager = DftImager;
    let (dirty, _) = imager.invert(&observed, &template, false).unwrap();

    // The centre pixel recovers the flux; every other pixel is below it.
    assert_abs_diff_eq!(dirty.data[[0, 0, 4, 4]], 2.0, epsilon = 1e-9);
    for ((_, _, iy, ix), &x) in dirty.data.indexed_iter() {
        if (iy, ix) != (4, 4) {
            assert!(x < 2.0);
        }
    }
}

#[test]
fn test_invert_shape_mismatch_is_eager() {
    let vis = synthetic_dataset(1, 3, 2);
    let template = test_image(1, 8);
    let imager = DftImager;
    assert!(matches!(
        imager.invert(&vis, &template, false),
        Err(ImagingError::PolMismatch { .. })
    ));
}

#[test]
fn test_zero_weight_rows_are_ignored_by_invert() {
    let observed = {
        let vis = synthetic_dataset(1, 4, 1);
        predict_components(&vis, &[offset_point("c", 1.0, 0.0, 1)]).unwrap()
    };
    let template = test_image(1, 8);
    let imager = DftImager;
    let (reference, _) = imager.invert(&observed, &template, false).unwrap();

    // Doubling a row's visibility while zeroing its imaging weight must not
    // change the result.
    let mut modified = observed.clone();
    modified.vis[[0, 0, 0]] *= 2.0;
    modified.imaging_weight[[0, 0, 0]] = 0.0;
    let (dirty, sumwt) = imager.invert(&modified, &template, false).unwrap();
    assert_abs_diff_eq!(sumwt[[0, 0]], observed.nrows() as f64 - 1.0);
    // The peak moves only through the normalisation, not the zeroed row.
    assert_abs_diff_eq!(
        dirty.data[[0, 0, 4, 4]],
        reference.data[[0, 0, 4, 4]],
        epsilon = 1e-9
    );
}
