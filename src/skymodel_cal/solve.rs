// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The numerical fits behind the M step: per-antenna gain solving and
//! component flux re-fitting.

use log::trace;
use marlu::c64;
use num_complex::Complex64;
use num_traits::Zero;

use super::{SageOptions, SolveError};
use crate::{
    constants::MAX_SOLVE_ITERATIONS,
    gains::{apply_gaintable, create_gaintable, GainTable},
    imaging::{component_phasors, predict_components, Imager},
    math::nearest_index,
    srclist::{SkyModel, Skycomponent},
    vis::Visibility,
};

/// Predict a sky model's visibilities (components plus images, no gains)
/// into a zeroed copy of `vis`.
pub(crate) fn predict_skymodel(
    vis: &Visibility,
    skymodel: &SkyModel,
    imager: &dyn Imager,
) -> Result<Visibility, SolveError> {
    let mut model = predict_components(vis, &skymodel.components)?;
    for image in &skymodel.images {
        model.accumulate(&imager.predict(vis, image)?)?;
    }
    Ok(model)
}

/// Re-solve a gain table against a windowed visibility, by predicting the
/// sky model and running the damped per-antenna solve.
pub fn fit_gaintable(
    evis: &Visibility,
    skymodel: &SkyModel,
    options: &SageOptions,
    imager: &dyn Imager,
) -> Result<GainTable, SolveError> {
    let model = predict_skymodel(evis, skymodel, imager)?;
    solve_gains(evis, &model, options)
}

/// Solve per-antenna complex gains such that
/// `data ≈ g[antenna1] * conj(g[antenna2]) * model`, independently per
/// solution interval, channel and polarisation.
///
/// Each inner iteration accumulates a per-antenna numerator and denominator
/// over all baselines involving that antenna and takes a `gain`-damped step
/// towards the least-squares estimate. Solved phases are referenced to the
/// first constrained antenna. Degenerate solves are hard failures: masking
/// them would silently corrupt everything downstream that sums over windows.
pub fn solve_gains(
    data: &Visibility,
    model: &Visibility,
    options: &SageOptions,
) -> Result<GainTable, SolveError> {
    data.check_same_shape(model)?;
    if model.vis.iter().all(|v| v.norm_sqr() == 0.0) {
        return Err(SolveError::EmptyModel);
    }

    let mut gains = create_gaintable(data, options.timeslice)?;
    let nant = gains.nant();

    // Group rows by the solution interval they fall in.
    let solution_times: Vec<f64> = gains.time.iter().map(|e| e.to_gpst_seconds()).collect();
    let mut rows_per_solution: Vec<Vec<usize>> = vec![vec![]; gains.ntime()];
    for r in 0..data.nrows() {
        rows_per_solution[nearest_index(&solution_times, data.time[r].to_gpst_seconds())].push(r);
    }

    for (t, rows) in rows_per_solution.iter().enumerate() {
        if rows.is_empty() {
            continue;
        }
        for c in 0..data.nchan() {
            for p in 0..data.npol() {
                let mut g = vec![c64::new(1.0, 0.0); nant];
                let mut iteration = 0;
                let mut precision = f64::INFINITY;
                let mut converged = false;
                while iteration < MAX_SOLVE_ITERATIONS {
                    iteration += 1;
                    let mut top = vec![Complex64::zero(); nant];
                    let mut bot = vec![0.0; nant];
                    for &r in rows {
                        let weight = data.weight[[r, c, p]];
                        if weight <= 0.0 {
                            continue;
                        }
                        let (a1, a2) = (data.antenna1[r], data.antenna2[r]);
                        if a1 == a2 {
                            continue;
                        }
                        let d = data.vis[[r, c, p]];
                        let m = model.vis[[r, c, p]];
                        // The data is g1 z1 with z1 = conj(g2) m ...
                        let z1 = g[a2].conj() * m;
                        top[a1] += z1.conj() * d * weight;
                        bot[a1] += z1.norm_sqr() * weight;
                        // ... and its conjugate is g2 z2 with z2 = conj(g1 m).
                        let z2 = (g[a1] * m).conj();
                        top[a2] += z2.conj() * d.conj() * weight;
                        bot[a2] += z2.norm_sqr() * weight;
                    }

                    precision = 0.0;
                    let mut constrained = 0;
                    for a in 0..nant {
                        if bot[a] > 0.0 {
                            constrained += 1;
                            let estimate = top[a] / bot[a];
                            if !estimate.re.is_finite() || !estimate.im.is_finite() {
                                return Err(SolveError::Singular { antenna: a, chan: c });
                            }
                            let previous = g[a];
                            g[a] = previous * (1.0 - options.gain) + estimate * options.gain;
                            precision = precision.max((g[a] - previous).norm_sqr());
                        }
                    }
                    if constrained == 0 {
                        return Err(SolveError::EmptyModel);
                    }
                    if precision < options.tol {
                        converged = true;
                        break;
                    }
                }
                if !converged {
                    return Err(SolveError::DidNotConverge {
                        iterations: iteration,
                        precision,
                    });
                }
                trace!(
                    "gain solve t={t} c={c} p={p} converged after {iteration} iterations at {precision:.3e}"
                );

                // The solution has a free global phase; reference it to the
                // first constrained antenna.
                if let Some(reference) = g.iter().find(|x| x.norm_sqr() > 0.0) {
                    let phase = reference / reference.norm();
                    let rotate = phase.conj();
                    for a in 0..nant {
                        g[a] *= rotate;
                    }
                }
                for (a, &value) in g.iter().enumerate() {
                    gains.gain[[t, a, c, p]] = value;
                }
            }
        }
    }
    Ok(gains)
}

/// Re-fit a sky model against a windowed visibility: each component's flux is
/// nudged towards its weighted least-squares estimate by the damping factor.
/// Directions, shapes and any model images are carried through unchanged.
pub fn fit_skymodel(
    evis: &Visibility,
    skymodel: &SkyModel,
    options: &SageOptions,
) -> Result<SkyModel, SolveError> {
    let mut components = Vec::with_capacity(skymodel.components.len());
    for comp in &skymodel.components {
        let phasors = component_phasors(evis, comp)?;
        let mut flux = comp.flux.clone();
        for c in 0..evis.nchan() {
            for p in 0..evis.npol() {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for r in 0..evis.nrows() {
                    let weight = evis.weight[[r, c, p]];
                    if weight <= 0.0 {
                        continue;
                    }
                    let phasor = phasors[[r, c]];
                    numerator += weight * (evis.vis[[r, c, p]] * phasor.conj()).re;
                    denominator += weight * phasor.norm_sqr();
                }
                if denominator > 0.0 {
                    let estimate = numerator / denominator;
                    flux[[c, p]] =
                        flux[[c, p]] * (1.0 - options.gain) + estimate * options.gain;
                }
            }
        }
        components.push(Skycomponent {
            flux,
            ..comp.clone()
        });
    }
    Ok(SkyModel {
        images: skymodel.images.clone(),
        components,
    })
}

/// Globally-synchronised self-calibration: divide each observed dataset by
/// its model, gather the quotients across frequency, integrate them into a
/// single channel, solve one gain table from the result, and apply its
/// inverse to every input dataset.
pub fn solve_global_gains(
    vis_list: &[Visibility],
    model_list: &[Visibility],
    options: &SageOptions,
) -> Result<Vec<Visibility>, SolveError> {
    if vis_list.is_empty() || vis_list.len() != model_list.len() {
        return Err(SolveError::GlobalLists {
            observed: vis_list.len(),
            models: model_list.len(),
        });
    }
    let divided: Vec<Visibility> = vis_list
        .iter()
        .zip(model_list)
        .map(|(vis, model)| vis.divide(model))
        .collect::<Result<_, _>>()?;
    let gathered = Visibility::gather_channels(&divided)?;
    let integrated = gathered.integrate_channels();
    let unit = integrated.unit_model();
    let gains = solve_gains(&integrated, &unit, options)?;
    vis_list
        .iter()
        .map(|vis| apply_gaintable(vis, &gains, true).map_err(SolveError::from))
        .collect()
}
