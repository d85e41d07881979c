// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

pub use marlu::constants::VEL_C;

/// Default width of a time-partition window \[seconds\].
pub const DEFAULT_TIMESLICE: f64 = 1.0;

/// Default number of SAGE expectation-maximisation cycles.
pub const DEFAULT_NITER: usize = 10;

/// Default convergence tolerance for the per-window gain solves.
pub const DEFAULT_TOL: f64 = 1e-8;

/// Default damping factor applied to M-step updates. Values close to 1 take
/// full steps and may oscillate; values close to 0 converge slowly.
pub const DEFAULT_GAIN: f64 = 0.25;

/// The maximum number of inner iterations a single gain solve may take before
/// it is declared unconverged.
pub const MAX_SOLVE_ITERATIONS: usize = 100;
