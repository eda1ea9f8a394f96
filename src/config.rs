//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter for the zdFF pipeline.
//! All fields have defaults matching the values the analysis was designed
//! around; [`AirPlsParams`] and [`LassoParams`] carry the per-stage settings
//! for callers who run a stage on its own.
use serde::{Deserialize, Serialize};

use crate::smooth::WindowKind;

/// Configuration for the full zdFF pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use zdff::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     smooth_win: 20,      // heavier low-pass
///     lambda:     1e5,     // stiffer baseline
///     ..PipelineConfig::default()
/// };
/// ```
///
/// The struct is `serde`-serialisable; missing keys in a JSON config fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of the smoothing kernel in samples.
    ///
    /// Values below 3 disable smoothing (the raw channel passes through).
    ///
    /// Default: `10`.
    pub smooth_win: usize,

    /// Shape of the smoothing kernel.
    ///
    /// Default: [`WindowKind::Flat`] (moving average).
    pub window: WindowKind,

    /// airPLS smoothness penalty.  Larger values give a stiffer baseline.
    ///
    /// Default: `5e4`.
    pub lambda: f64,

    /// Difference order passed through to the baseline estimator.
    ///
    /// Currently inert: the penalised solve always uses the first-order
    /// difference operator.
    ///
    /// Default: `1`.
    pub porder: usize,

    /// airPLS iteration cap.
    ///
    /// Default: `50`.
    pub itermax: usize,

    /// Settings for the reference → signal regression.
    pub lasso: LassoParams,

    /// Run the reference and signal chains (smooth, detrend, standardise)
    /// on two threads.  Output is identical either way.
    ///
    /// Default: `true`.
    pub parallel_channels: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smooth_win: 10,
            window: WindowKind::Flat,
            lambda: 5e4,
            porder: 1,
            itermax: 50,
            lasso: LassoParams::default(),
            parallel_channels: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config; absent keys take their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Baseline-estimator settings derived from this config.
    pub fn air_pls(&self) -> AirPlsParams {
        AirPlsParams {
            lambda: self.lambda,
            porder: self.porder,
            itermax: self.itermax,
        }
    }
}

/// Settings for a single airPLS run.
///
/// The defaults here are the bare estimator's (`lambda = 100`,
/// `itermax = 15`); the pipeline threads its own values through
/// [`PipelineConfig::air_pls`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirPlsParams {
    pub lambda: f64,
    pub porder: usize,
    pub itermax: usize,
}

impl Default for AirPlsParams {
    fn default() -> Self {
        Self {
            lambda: 100.0,
            porder: 1,
            itermax: 15,
        }
    }
}

/// Coordinate update order for [`crate::align::Lasso`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Cyclic,
    Random,
}

/// L1-penalised regression settings.
///
/// Objective: `(1 / 2n) · ‖y − Xβ − b‖² + alpha · ‖β‖₁`, with `β ≥ 0` when
/// `positive` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoParams {
    /// L1 penalty weight.  Default: `1e-4`.
    pub alpha: f64,
    /// Coordinate-descent sweep cap.  Default: `1000`.
    pub max_iter: usize,
    /// Stop when the largest coefficient update is below `tol · max |β|`.
    /// Default: `1e-4`.
    pub tol: f64,
    /// Constrain coefficients to be non-negative.  Default: `true`.
    pub positive: bool,
    /// Fit an unpenalised intercept.  Default: `true`.
    pub fit_intercept: bool,
    /// Default: [`Selection::Random`].
    pub selection: Selection,
    /// Seed for random coordinate selection.  Default: `9999`.
    pub seed: u64,
}

impl Default for LassoParams {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            max_iter: 1000,
            tol: 1e-4,
            positive: true,
            fit_intercept: true,
            selection: Selection::Random,
            seed: 9999,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.smooth_win, 10);
        assert_eq!(cfg.window, WindowKind::Flat);
        assert_eq!(cfg.lambda, 5e4);
        assert_eq!(cfg.itermax, 50);
        assert_eq!(cfg.lasso.alpha, 1e-4);
        assert_eq!(cfg.lasso.max_iter, 1000);

        let bare = AirPlsParams::default();
        assert_eq!(bare.lambda, 100.0);
        assert_eq!(bare.itermax, 15);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: PipelineConfig =
            PipelineConfig::from_json(r#"{ "smooth_win": 4, "window": "hanning", "lasso": { "seed": 1 } }"#)
                .unwrap();
        assert_eq!(cfg.smooth_win, 4);
        assert_eq!(cfg.window, WindowKind::Hanning);
        assert_eq!(cfg.lasso.seed, 1);
        assert_eq!(cfg.lasso.alpha, 1e-4);
        assert_eq!(cfg.itermax, 50);
    }

    #[test]
    fn air_pls_params_follow_pipeline() {
        let cfg = PipelineConfig { lambda: 7.0, itermax: 3, ..PipelineConfig::default() };
        let p = cfg.air_pls();
        assert_eq!(p.lambda, 7.0);
        assert_eq!(p.itermax, 3);
        assert_eq!(p.porder, 1);
    }
}
