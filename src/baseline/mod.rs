//! airPLS baseline estimation (adaptive iteratively reweighted penalised
//! least squares; Zhang, Chen & Liang, 2010).
//!
//! Each iteration fits a weighted Whittaker smooth ([`whittaker`]) and then
//! re-weights: samples above the fit are treated as signal and dropped
//! (`w = 0`), samples below it are trusted as baseline with weight
//! `exp(i·|d|/dssn)`.  Both endpoints share the weight
//! `exp(i·max|d⁻|/dssn)` to pin the fit at the edges.
//!
//! Stops when the total negative residual `dssn` falls below
//! `0.001 · Σ|x|` (or is exactly zero), or when `itermax` is reached.  The
//! latter is a warning, not an error: the last fit is returned.

pub mod whittaker;

pub use whittaker::{smooth_weighted, solve_symmetric_tridiagonal};

use log::{debug, warn};
use serde::Serialize;

use crate::config::AirPlsParams;
use crate::error::{Result, ZdffError};

/// Relative `dssn` threshold for convergence.
pub const CONVERGENCE_RATIO: f64 = 0.001;

/// Result of an airPLS run.
#[derive(Debug, Clone, Serialize)]
pub struct BaselineFit {
    /// Estimated baseline, same length as the input.
    pub baseline: Vec<f64>,
    /// Number of weighted solves performed.
    pub iterations: usize,
    /// `false` when the loop stopped on `itermax`.
    pub converged: bool,
    /// `dssn` after each solve.
    pub dssn_history: Vec<f64>,
}

/// Estimate the baseline of `x`.
///
/// `porder` is accepted for interface compatibility and is not consulted:
/// the penalty is always first-order.
///
/// # Errors
///
/// [`ZdffError::InvalidInput`] for empty input or `itermax == 0`.
pub fn estimate_baseline(x: &[f64], lambda: f64, porder: usize, itermax: usize) -> Result<Vec<f64>> {
    air_pls(x, &AirPlsParams { lambda, porder, itermax }).map(|fit| fit.baseline)
}

/// Run airPLS and report convergence details alongside the baseline.
pub fn air_pls(x: &[f64], params: &AirPlsParams) -> Result<BaselineFit> {
    let m = x.len();
    if m == 0 {
        return Err(ZdffError::InvalidInput("cannot estimate the baseline of an empty sequence".into()));
    }
    if params.itermax == 0 {
        return Err(ZdffError::InvalidInput("airPLS needs itermax >= 1".into()));
    }

    let threshold = CONVERGENCE_RATIO * x.iter().map(|v| v.abs()).sum::<f64>();
    let mut w = vec![1.0_f64; m];
    let mut dssn_history = Vec::with_capacity(params.itermax);

    for i in 1..=params.itermax {
        let z = smooth_weighted(x, &w, params.lambda)?;
        let d: Vec<f64> = x.iter().zip(&z).map(|(xi, zi)| xi - zi).collect();
        let dssn: f64 = d.iter().filter(|&&v| v < 0.0).map(|v| v.abs()).sum();
        dssn_history.push(dssn);

        let converged = dssn == 0.0 || dssn < threshold;
        if converged || i == params.itermax {
            if converged {
                debug!("airPLS converged after {i} iterations (dssn = {dssn:.3e})");
            } else {
                warn!(
                    "airPLS: max iteration reached ({i}) before convergence \
                     (dssn = {dssn:.3e}, threshold = {threshold:.3e})"
                );
            }
            return Ok(BaselineFit {
                baseline: z,
                iterations: i,
                converged,
                dssn_history,
            });
        }

        reweight(&mut w, &d, i, dssn);
    }

    unreachable!("airPLS loop returns on its final iteration")
}

/// Iteration-`i` weights: zero above the fit, `exp(i·|d|/dssn)` below it.
fn reweight(w: &mut [f64], d: &[f64], i: usize, dssn: f64) {
    let scale = i as f64 / dssn;
    let mut max_neg = 0.0_f64;
    for (wi, &di) in w.iter_mut().zip(d) {
        if di >= 0.0 {
            *wi = 0.0;
        } else {
            *wi = (scale * di.abs()).exp();
            max_neg = max_neg.max(di.abs());
        }
    }
    // Ends take the largest |d| among negative residuals, not the
    // negative residual closest to zero.
    let edge = (scale * max_neg).exp();
    let m = w.len();
    w[0] = edge;
    w[m - 1] = edge;
}
