// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SAGE calibration over sky-model windows.
//!
//! Non-isoplanatic calibration is decomposed into per-direction windows,
//! each a [`CalWindow`]: one sky model paired with one gain table. The solve
//! alternates, for a fixed number of iterations, a globally-synchronised E
//! step (the sum of every window's gain-corrupted model prediction) with
//! per-window E and M steps. Within an iteration only the E-step-all
//! reduction synchronises; everything else is per-window and independent, so
//! the graph exposes all available parallelism to the evaluator.
//!
//! Windows are replaced wholesale each M step, never mutated, which keeps
//! every node pure and every iteration's data dependencies explicit.

mod error;
mod solve;

pub use error::SolveError;
pub use solve::{fit_gaintable, fit_skymodel, solve_gains, solve_global_gains};

use std::sync::Arc;

use hifitime::Duration;
use log::debug;

use crate::{
    constants::{DEFAULT_GAIN, DEFAULT_NITER, DEFAULT_TIMESLICE, DEFAULT_TOL},
    gains::{apply_gaintable, create_gaintable, GainTable},
    graph::{Handle, TaskGraph, Value},
    imaging::Imager,
    srclist::SkyModel,
    vis::Visibility,
};

use solve::predict_skymodel;

/// One calibration direction: a sky model and the gains currently
/// attributed to it.
#[derive(Clone, Debug)]
pub struct CalWindow {
    pub skymodel: SkyModel,
    pub gaintable: GainTable,
}

/// Options for the SAGE solve.
#[derive(Clone, Copy, Debug)]
pub struct SageOptions {
    /// The number of E/M cycles to run. The loop always runs to `niter`;
    /// `tol` bounds the inner gain solves, not the outer loop.
    pub niter: usize,

    /// Damping factor for M-step updates, in (0, 1].
    pub gain: f64,

    /// Convergence tolerance of the inner gain solves.
    pub tol: f64,

    /// Width of a gain solution interval. `None` solves per unique
    /// timestamp.
    pub timeslice: Option<Duration>,
}

impl Default for SageOptions {
    fn default() -> SageOptions {
        SageOptions {
            niter: DEFAULT_NITER,
            gain: DEFAULT_GAIN,
            tol: DEFAULT_TOL,
            timeslice: Some(Duration::from_seconds(DEFAULT_TIMESLICE)),
        }
    }
}

impl SageOptions {
    pub fn validate(&self) -> Result<(), SolveError> {
        if self.niter < 1 {
            return Err(SolveError::Niter);
        }
        if !(self.gain > 0.0 && self.gain <= 1.0) {
            return Err(SolveError::Damping { got: self.gain });
        }
        if !(self.tol > 0.0 && self.tol.is_finite()) {
            return Err(SolveError::Tol { got: self.tol });
        }
        Ok(())
    }
}

/// The handles a composed SAGE solve leaves behind: the final window of each
/// calibration direction, and the residual visibility.
#[derive(Clone, Debug)]
pub struct SageHandles {
    pub windows: Vec<Handle>,
    pub residual: Handle,
}

/// A window's model visibility under its current gains.
pub(crate) fn predict_window(
    vis: &Visibility,
    window: &CalWindow,
    imager: &dyn Imager,
) -> Result<Visibility, SolveError> {
    let model = predict_skymodel(vis, &window.skymodel, imager)?;
    Ok(apply_gaintable(&model, &window.gaintable, false)?)
}

/// One initialisation node per direction: pair a copy of the direction's sky
/// model with an initial (unity) gain table estimated from the dataset.
pub fn initialise_windows(
    graph: &mut TaskGraph,
    vis_in: Handle,
    skymodels: &[SkyModel],
    options: &SageOptions,
) -> Vec<Handle> {
    skymodels
        .iter()
        .map(|skymodel| {
            let skymodel = skymodel.clone();
            let timeslice = options.timeslice;
            graph
                .add("init-window", 1, &[vis_in], move |inputs| {
                    let vis = inputs[0].as_vis()?;
                    let gaintable = create_gaintable(vis, timeslice)?;
                    Ok(vec![Value::from(CalWindow {
                        skymodel: skymodel.clone(),
                        gaintable,
                    })])
                })
                .single()
        })
        .collect()
}

/// The global synchronisation point of an iteration: predict every window's
/// gain-corrupted model visibility and sum them. Every window's E step for
/// this iteration depends on this one node.
pub fn e_all(
    graph: &mut TaskGraph,
    vis_in: Handle,
    windows: &[Handle],
    imager: &Arc<dyn Imager>,
) -> Handle {
    let predictions: Vec<Handle> = windows
        .iter()
        .map(|&window| {
            let imager = Arc::clone(imager);
            graph
                .add("predict-window", 1, &[vis_in, window], move |inputs| {
                    let vis = inputs[0].as_vis()?;
                    let window = inputs[1].as_window()?;
                    Ok(vec![Value::from(predict_window(
                        vis,
                        window,
                        imager.as_ref(),
                    )?)])
                })
                .single()
        })
        .collect();
    graph
        .add("sum-evis", 1, &predictions, |inputs| {
            let mut accumulated = inputs[0].as_vis()?.clone();
            for partial in &inputs[1..] {
                accumulated.accumulate(partial.as_vis()?)?;
            }
            Ok(vec![Value::from(accumulated)])
        })
        .single()
}

/// The per-window E step: this window's model plus the difference between
/// the observed data and all windows' summed models. Equivalently, the
/// observed data with every *other* window's contribution removed.
pub fn e_step(
    graph: &mut TaskGraph,
    vis_in: Handle,
    evis_all: Handle,
    windows: &[Handle],
    imager: &Arc<dyn Imager>,
) -> Vec<Handle> {
    windows
        .iter()
        .map(|&window| {
            let imager = Arc::clone(imager);
            graph
                .add("e-step", 1, &[vis_in, window, evis_all], move |inputs| {
                    let vis = inputs[0].as_vis()?;
                    let window = inputs[1].as_window()?;
                    let all = inputs[2].as_vis()?;
                    let predicted = predict_window(vis, window, imager.as_ref())?;
                    let mut evis = vis.clone();
                    evis.vis = &predicted.vis + &vis.vis - &all.vis;
                    Ok(vec![Value::from(evis)])
                })
                .single()
        })
        .collect()
}

/// The per-window M step: re-fit the window's sky model and re-solve its
/// gain table against the window's E-step visibility, producing a wholesale
/// new window. Cross-window M steps are independent.
pub fn m_step(
    graph: &mut TaskGraph,
    evis: &[Handle],
    windows: &[Handle],
    options: &SageOptions,
    imager: &Arc<dyn Imager>,
) -> Vec<Handle> {
    evis.iter()
        .zip(windows)
        .map(|(&evis, &window)| {
            let options = *options;
            let imager = Arc::clone(imager);
            graph
                .add("m-step", 1, &[evis, window], move |inputs| {
                    let evis = inputs[0].as_vis()?;
                    let window = inputs[1].as_window()?;
                    let skymodel = fit_skymodel(evis, &window.skymodel, &options)?;
                    let gaintable =
                        fit_gaintable(evis, &window.skymodel, &options, imager.as_ref())?;
                    Ok(vec![Value::from(CalWindow {
                        skymodel,
                        gaintable,
                    })])
                })
                .single()
        })
        .collect()
}

/// Compose the full SAGE solve: initialise one window per input direction,
/// run `niter` E/M cycles, then one final E-step-all to reconstruct the
/// total model visibility and the residual `observed − total`.
pub fn solve(
    graph: &mut TaskGraph,
    vis: &Visibility,
    skymodels: &[SkyModel],
    options: &SageOptions,
    imager: &Arc<dyn Imager>,
) -> Result<SageHandles, SolveError> {
    options.validate()?;
    if skymodels.is_empty() {
        return Err(SolveError::NoWindows);
    }

    let vis_in = graph.input("observed", Value::from(vis.clone()));
    let mut windows = initialise_windows(graph, vis_in, skymodels, options);
    for iteration in 0..options.niter {
        let evis_all = e_all(graph, vis_in, &windows, imager);
        let evis = e_step(graph, vis_in, evis_all, &windows, imager);
        windows = m_step(graph, &evis, &windows, options, imager);
        debug!(
            "composed SAGE iteration {}/{} over {} windows",
            iteration + 1,
            options.niter,
            windows.len()
        );
    }

    let total = e_all(graph, vis_in, &windows, imager);
    let residual = graph
        .add("residual-vis", 1, &[vis_in, total], |inputs| {
            Ok(vec![Value::from(
                inputs[0].as_vis()?.subtract(inputs[1].as_vis()?)?,
            )])
        })
        .single();

    Ok(SageHandles { windows, residual })
}
