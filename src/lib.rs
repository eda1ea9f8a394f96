//! # zdff — motion- and bleaching-corrected fiber-photometry signals
//!
//! `zdff` turns a dual-wavelength fiber-photometry recording (a
//! calcium-dependent *signal* channel and an isosbestic *reference* channel,
//! sampled frame-by-frame) into a single standardised, artifact-corrected
//! trace, the **zdFF**.
//!
//! ## Pipeline overview
//!
//! ```text
//! reference_raw                 signal_raw
//!   │                             │
//!   ├─ smooth::smooth()           ├─ windowed moving average (flat by default, 10 taps)
//!   ├─ baseline::air_pls()        ├─ airPLS bleaching trend, subtracted
//!   ├─ normalize::standardize()   ├─ (x − median) / std
//!   │                             │
//!   └──────────────┬──────────────┘
//!                  ├─ align::fit_reference()   non-negative Lasso, signal ~ β·reference + b
//!                  └─ signal_std − prediction  → zdFF
//! ```
//!
//! The two channel chains are independent until the regression and run on
//! two threads by default ([`PipelineConfig::parallel_channels`]).
//!
//! ## Quick start
//!
//! ```
//! use zdff::{get_zdff, PipelineConfig};
//!
//! let reference: Vec<f64> = (0..2000)
//!     .map(|i| 1.0 + 0.2 * (-(i as f64) / 800.0).exp() + 0.05 * (i as f64 * 0.031).sin())
//!     .collect();
//! let signal: Vec<f64> = reference
//!     .iter()
//!     .enumerate()
//!     .map(|(i, r)| 2.0 * r + 0.1 * (i as f64 * 0.013).sin())
//!     .collect();
//!
//! let trace = get_zdff(&reference, &signal, &PipelineConfig::default()).unwrap();
//! assert_eq!(trace.len(), 2000);
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use zdff::smooth::{smooth, WindowKind};
//! use zdff::baseline::estimate_baseline;
//! use zdff::normalize::standardize;
//!
//! let x: Vec<f64> = (0..500).map(|i| 3.0 + (i as f64 * 0.05).sin()).collect();
//! let smoothed  = smooth(&x, 10, WindowKind::Hanning).unwrap();
//! let baseline  = estimate_baseline(&smoothed, 100.0, 1, 15).unwrap();
//! let detrended: Vec<f64> = smoothed.iter().zip(&baseline).map(|(s, b)| s - b).collect();
//! let z = standardize(&detrended).unwrap();
//! assert_eq!(z.len(), smoothed.len());
//! ```

pub mod align;
pub mod baseline;
pub mod config;
pub mod error;
pub mod normalize;
pub mod smooth;

use log::debug;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use serde::Serialize;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use align::{fit_and_predict, fit_reference, Lasso};
pub use baseline::{air_pls, estimate_baseline, smooth_weighted, BaselineFit};
pub use config::{AirPlsParams, LassoParams, PipelineConfig, Selection};
pub use error::{Result, Warning, ZdffError};
pub use normalize::{median, standardize, standardize_with_scale, std_dev};
pub use smooth::{smooth, smoothed_len, WindowKind};

/// Every intermediate series of one channel's chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSteps {
    pub smoothed: Vec<f64>,
    pub baseline: Vec<f64>,
    pub baseline_iterations: usize,
    pub baseline_converged: bool,
    pub detrended: Vec<f64>,
    pub standardized: Vec<f64>,
}

/// Full record of a pipeline run, as returned by [`get_zdff_steps`].
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSteps {
    pub reference: ChannelSteps,
    pub signal: ChannelSteps,
    /// The fitted reference → signal model.
    pub regression: Lasso,
    /// Artifact component predicted from the standardised reference.
    pub predicted: Vec<f64>,
    pub zdff: Vec<f64>,
    pub warnings: Vec<Warning>,
}

/// Compute the zdFF trace of one recording.
///
/// # Errors
///
/// * [`ZdffError::LengthMismatch`] if the channels differ in length (checked
///   before any numeric work).
/// * [`ZdffError::InvalidInput`] for empty or non-finite channels, or
///   channels shorter than `cfg.smooth_win`.
/// * [`ZdffError::DegenerateInput`] if a detrended channel has no variance.
///
/// Non-convergence of airPLS or of the regression is logged, not returned.
pub fn get_zdff(reference: &[f64], signal: &[f64], cfg: &PipelineConfig) -> Result<Vec<f64>> {
    get_zdff_steps(reference, signal, cfg).map(|steps| steps.zdff)
}

/// As [`get_zdff`], keeping every intermediate stage.
pub fn get_zdff_steps(reference: &[f64], signal: &[f64], cfg: &PipelineConfig) -> Result<PipelineSteps> {
    validate_channels(reference, signal)?;

    let (reference_steps, signal_steps) = if cfg.parallel_channels {
        let (r, s) = rayon::join(
            || process_channel(reference, cfg, "reference"),
            || process_channel(signal, cfg, "signal"),
        );
        (r?, s?)
    } else {
        (
            process_channel(reference, cfg, "reference")?,
            process_channel(signal, cfg, "signal")?,
        )
    };

    let mut warnings = Vec::new();
    for (label, steps) in [("reference", &reference_steps), ("signal", &signal_steps)] {
        if !steps.baseline_converged {
            warnings.push(Warning::BaselineNotConverged {
                channel: label,
                iterations: steps.baseline_iterations,
            });
        }
    }

    let regression = fit_reference(&reference_steps.standardized, &signal_steps.standardized, &cfg.lasso)?;
    if !regression.converged() {
        warnings.push(Warning::RegressionNotConverged { iterations: regression.n_iter() });
    }
    let beta = regression.coef()[0];
    let intercept = regression.intercept();
    let predicted: Vec<f64> = reference_steps
        .standardized
        .iter()
        .map(|r| beta * r + intercept)
        .collect();

    let zdff: Vec<f64> = signal_steps
        .standardized
        .iter()
        .zip(&predicted)
        .map(|(s, p)| s - p)
        .collect();
    debug!("zdFF: {} samples, beta = {beta:.4}, {} warning(s)", zdff.len(), warnings.len());

    Ok(PipelineSteps {
        reference: reference_steps,
        signal: signal_steps,
        regression,
        predicted,
        zdff,
        warnings,
    })
}

/// Run the pipeline on several regions at once (e.g. a bilateral recording).
///
/// `reference` and `signal` are `[R, T]`: one row per region, one column per
/// frame.  Regions are processed independently and in parallel.  Returns
/// `[R, T']` with `T' = smoothed_len(T, cfg.smooth_win)`.
///
/// # Errors
///
/// [`ZdffError::InvalidInput`] if the region counts differ or are zero;
/// otherwise the first failing region's error.
pub fn zdff_regions(
    reference: ArrayView2<f64>,
    signal: ArrayView2<f64>,
    cfg: &PipelineConfig,
) -> Result<Array2<f64>> {
    let (n_regions, n_t) = reference.dim();
    if n_regions == 0 || n_regions != signal.nrows() {
        return Err(ZdffError::InvalidInput(format!(
            "reference has {n_regions} region(s), signal has {}",
            signal.nrows()
        )));
    }
    if n_t != signal.ncols() {
        return Err(ZdffError::LengthMismatch { reference: n_t, signal: signal.ncols() });
    }

    let traces: Vec<Vec<f64>> = (0..n_regions)
        .into_par_iter()
        .map(|r| {
            let reference_row = reference.row(r).to_vec();
            let signal_row = signal.row(r).to_vec();
            get_zdff(&reference_row, &signal_row, cfg)
        })
        .collect::<Result<_>>()?;

    let n_out = smoothed_len(n_t, cfg.smooth_win);
    let flat: Vec<f64> = traces.into_iter().flatten().collect();
    Array2::from_shape_vec((n_regions, n_out), flat).map_err(|e| ZdffError::InvalidInput(e.to_string()))
}

fn validate_channels(reference: &[f64], signal: &[f64]) -> Result<()> {
    if reference.len() != signal.len() {
        return Err(ZdffError::LengthMismatch {
            reference: reference.len(),
            signal: signal.len(),
        });
    }
    if reference.is_empty() {
        return Err(ZdffError::InvalidInput("channels are empty".into()));
    }
    for (label, x) in [("reference", reference), ("signal", signal)] {
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err(ZdffError::InvalidInput(format!(
                "{label} channel has a non-finite sample at frame {i}"
            )));
        }
    }
    Ok(())
}

/// Smooth → airPLS detrend → standardise for one channel.
fn process_channel(raw: &[f64], cfg: &PipelineConfig, label: &'static str) -> Result<ChannelSteps> {
    let smoothed = smooth::smooth(raw, cfg.smooth_win, cfg.window)?;
    let fit = baseline::air_pls(&smoothed, &cfg.air_pls())?;

    let detrended: Vec<f64> = smoothed.iter().zip(&fit.baseline).map(|(s, b)| s - b).collect();
    let scale = smoothed.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let standardized = normalize::standardize_with_scale(&detrended, scale, label)?;
    debug!(
        "{label}: {} → {} samples, airPLS {} iteration(s){}",
        raw.len(),
        smoothed.len(),
        fit.iterations,
        if fit.converged { "" } else { " (not converged)" }
    );

    Ok(ChannelSteps {
        smoothed,
        baseline: fit.baseline,
        baseline_iterations: fit.iterations,
        baseline_converged: fit.converged,
        detrended,
        standardized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_samples_rejected() {
        let mut x = vec![1.0; 50];
        x[7] = f64::NAN;
        let err = get_zdff(&x, &[1.0; 50], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ZdffError::InvalidInput(_)));
    }

    #[test]
    fn empty_channels_rejected() {
        let err = get_zdff(&[], &[], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ZdffError::InvalidInput(_)));
    }

    #[test]
    fn region_count_mismatch_rejected() {
        let r = Array2::<f64>::zeros((2, 100));
        let s = Array2::<f64>::zeros((1, 100));
        let err = zdff_regions(r.view(), s.view(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ZdffError::InvalidInput(_)));
    }
}
