//! Cross-channel alignment: non-negative Lasso regression of the signal
//! channel on the reference channel.
//!
//! Coordinate descent on the Gram matrix `Q = XᵀX` (centred when fitting an
//! intercept), minimising
//!
//! ```text
//! (1 / 2n) · ‖y − Xβ − b‖² + alpha · ‖β‖₁      (β ≥ 0 when positive)
//! ```
//!
//! A sweep visits `p` coordinates, either in order or drawn uniformly with
//! replacement from a seeded [`StdRng`].  After a sweep whose largest update
//! is below `tol · max|β|` the duality gap is checked against
//! `tol · ‖y‖²`; reaching `max_iter` first leaves the last iterate in place
//! and reports non-convergence.
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{LassoParams, Selection};
use crate::error::{Result, ZdffError};

/// L1-penalised linear model with an optional non-negativity constraint.
///
/// Constructed with hyperparameters, fitted once, then used to predict.
#[derive(Debug, Clone, Serialize)]
pub struct Lasso {
    params: LassoParams,
    coef: Vec<f64>,
    intercept: f64,
    n_iter: usize,
    converged: bool,
    dual_gap: f64,
}

impl Lasso {
    pub fn new(params: LassoParams) -> Self {
        Self {
            params,
            coef: Vec::new(),
            intercept: 0.0,
            n_iter: 0,
            converged: false,
            dual_gap: f64::NAN,
        }
    }

    pub fn params(&self) -> &LassoParams {
        &self.params
    }

    /// Fitted coefficients, one per feature.  Empty before [`Lasso::fit`].
    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coordinate-descent sweeps performed by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn dual_gap(&self) -> f64 {
        self.dual_gap
    }

    /// Fit against design `x` (`[n, p]`) and target `y` (`[n]`).
    ///
    /// # Errors
    ///
    /// [`ZdffError::InvalidInput`] if `x` has no rows or columns, or
    /// [`ZdffError::LengthMismatch`] if `x` and `y` disagree on `n`.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<&mut Self> {
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(ZdffError::InvalidInput(format!("lasso design matrix is {n} × {p}")));
        }
        if y.len() != n {
            return Err(ZdffError::LengthMismatch { reference: n, signal: y.len() });
        }
        let LassoParams { alpha, max_iter, tol, positive, fit_intercept, selection, seed } = self.params;

        let (x_offset, y_offset) = if fit_intercept {
            let xm = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
            (xm, y.sum() / n as f64)
        } else {
            (Array1::zeros(p), 0.0)
        };
        let xc: Array2<f64> = &x - &x_offset;
        let yc: Array1<f64> = y.mapv(|v| v - y_offset);

        let gram = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);
        let y_norm2 = yc.dot(&yc);

        let l1_reg = alpha * n as f64;
        let gap_tol = tol * y_norm2;

        let mut w = Array1::<f64>::zeros(p);
        let mut h = Array1::<f64>::zeros(p); // Q · w
        let mut rng = StdRng::seed_from_u64(seed);

        let mut gap = f64::INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for it in 0..max_iter {
            n_iter = it + 1;
            let mut w_max = 0.0_f64;
            let mut d_w_max = 0.0_f64;

            for f in 0..p {
                let ii = match selection {
                    Selection::Cyclic => f,
                    Selection::Random => rng.gen_range(0..p),
                };
                let q_ii = gram.row(ii);
                let w_ii = w[ii];
                if w_ii != 0.0 {
                    h.scaled_add(-w_ii, &q_ii);
                }

                let tmp = xty[ii] - h[ii];
                let denom = gram[[ii, ii]];
                w[ii] = if denom == 0.0 || (positive && tmp < 0.0) {
                    0.0
                } else {
                    tmp.signum() * (tmp.abs() - l1_reg).max(0.0) / denom
                };

                if w[ii] != 0.0 {
                    h.scaled_add(w[ii], &q_ii);
                }
                d_w_max = d_w_max.max((w[ii] - w_ii).abs());
                w_max = w_max.max(w[ii].abs());
            }

            if w_max == 0.0 || d_w_max / w_max < tol || it + 1 == max_iter {
                gap = duality_gap(&w, &h, &xty, y_norm2, l1_reg, positive);
                if gap <= gap_tol {
                    converged = true;
                    break;
                }
            }
        }

        if !converged {
            warn!(
                "lasso: max_iter reached ({max_iter}) before convergence \
                 (dual gap = {gap:.3e}, tolerance = {gap_tol:.3e})"
            );
        }

        self.intercept = if fit_intercept { y_offset - x_offset.dot(&w) } else { 0.0 };
        self.coef = w.to_vec();
        self.n_iter = n_iter;
        self.converged = converged;
        self.dual_gap = gap;
        debug!(
            "lasso fit: coef = {:?}, intercept = {:.4e}, sweeps = {n_iter}",
            self.coef, self.intercept
        );
        Ok(self)
    }

    /// Predict `x · β + b`.
    ///
    /// # Errors
    ///
    /// [`ZdffError::InvalidInput`] if the model is unfitted or the feature
    /// count differs from the fitted one.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if self.coef.is_empty() {
            return Err(ZdffError::InvalidInput("lasso model has not been fitted".into()));
        }
        if x.ncols() != self.coef.len() {
            return Err(ZdffError::InvalidInput(format!(
                "lasso was fitted on {} features, got {}",
                self.coef.len(),
                x.ncols()
            )));
        }
        let beta = ArrayView1::from(&self.coef[..]);
        Ok(x.dot(&beta) + self.intercept)
    }
}

/// Duality gap of the Lasso problem in Gram form.
fn duality_gap(
    w: &Array1<f64>,
    h: &Array1<f64>,
    xty: &Array1<f64>,
    y_norm2: f64,
    l1_reg: f64,
    positive: bool,
) -> f64 {
    let q_dot_w = w.dot(xty);
    let r_norm2 = (y_norm2 + w.dot(h) - 2.0 * q_dot_w).max(0.0);

    let xta = xty - h;
    let dual_norm = if positive {
        xta.fold(f64::NEG_INFINITY, |m, &v| m.max(v))
    } else {
        xta.fold(0.0_f64, |m, &v| m.max(v.abs()))
    };

    let (konst, mut gap) = if dual_norm > l1_reg {
        let c = l1_reg / dual_norm;
        (c, 0.5 * (r_norm2 + r_norm2 * c * c))
    } else {
        (1.0, r_norm2)
    };
    let w_norm1: f64 = w.iter().map(|v| v.abs()).sum();
    gap += l1_reg * w_norm1 - konst * (y_norm2 - q_dot_w);
    gap
}

/// Fit the single-feature model `signal ≈ β · reference + b`.
pub fn fit_reference(reference_std: &[f64], signal_std: &[f64], params: &LassoParams) -> Result<Lasso> {
    if reference_std.len() != signal_std.len() {
        return Err(ZdffError::LengthMismatch {
            reference: reference_std.len(),
            signal: signal_std.len(),
        });
    }
    let x = ArrayView2::from_shape((reference_std.len(), 1), reference_std)
        .map_err(|e| ZdffError::InvalidInput(e.to_string()))?;
    let y = ArrayView1::from(signal_std);

    let mut model = Lasso::new(*params);
    model.fit(x, y)?;
    Ok(model)
}

/// Fit `signal_std` on `reference_std` and return the in-sample prediction,
/// i.e. the artifact component explained by the reference channel.
pub fn fit_and_predict(reference_std: &[f64], signal_std: &[f64], params: &LassoParams) -> Result<Vec<f64>> {
    let model = fit_reference(reference_std, signal_std, params)?;
    let x = ArrayView2::from_shape((reference_std.len(), 1), reference_std)
        .map_err(|e| ZdffError::InvalidInput(e.to_string()))?;
    Ok(model.predict(x)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn ols_slope(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len() as f64;
        let mx = x.iter().sum::<f64>() / n;
        let my = y.iter().sum::<f64>() / n;
        let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sxx: f64 = x.iter().map(|a| (a - mx) * (a - mx)).sum();
        sxy / sxx
    }

    #[test]
    fn single_feature_matches_soft_thresholded_ols() {
        let x: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
        let y: Vec<f64> = x.iter().enumerate().map(|(i, v)| 1.5 * v + 0.3 + 0.01 * (i as f64 * 1.3).cos()).collect();
        let params = LassoParams::default();
        let model = fit_reference(&x, &y, &params).unwrap();

        // Closed form for one feature: (x_cᵀy_c - n·alpha) / x_cᵀx_c.
        let n = x.len() as f64;
        let mx = x.iter().sum::<f64>() / n;
        let sxx: f64 = x.iter().map(|a| (a - mx) * (a - mx)).sum();
        let expected = ols_slope(&x, &y) - n * params.alpha / sxx;

        assert!(model.converged());
        assert_abs_diff_eq!(model.coef()[0], expected, epsilon = 1e-10);
        assert_abs_diff_eq!(model.coef()[0], 1.5, epsilon = 1e-2);
        assert_abs_diff_eq!(model.intercept(), 0.3, epsilon = 1e-2);
    }

    #[test]
    fn anticorrelated_input_gives_zero_coefficient() {
        let x: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|v| -2.0 * v + 1.0).collect();
        let model = fit_reference(&x, &y, &LassoParams::default()).unwrap();
        assert_eq!(model.coef()[0], 0.0);
        // Prediction collapses to the mean of y.
        let pred = fit_and_predict(&x, &y, &LassoParams::default()).unwrap();
        let my = y.iter().sum::<f64>() / y.len() as f64;
        for p in pred {
            assert_abs_diff_eq!(p, my, epsilon = 1e-12);
        }
    }

    #[test]
    fn unconstrained_keeps_negative_slope() {
        let x: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|v| -2.0 * v + 1.0).collect();
        let params = LassoParams { positive: false, ..LassoParams::default() };
        let model = fit_reference(&x, &y, &params).unwrap();
        assert_abs_diff_eq!(model.coef()[0], -2.0, epsilon = 1e-3);
    }

    #[test]
    fn large_alpha_zeroes_everything() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mut model = Lasso::new(LassoParams { alpha: 1e3, ..LassoParams::default() });
        model.fit(x.view(), y.view()).unwrap();
        assert!(model.coef().iter().all(|&c| c == 0.0));
        assert_abs_diff_eq!(model.intercept(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn two_features_recover_sparse_truth() {
        let n = 300;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { (i as f64 * 0.07).sin() } else { (i as f64 * 0.031).cos() }
        });
        let y = x.column(0).mapv(|v| 3.0 * v);
        for selection in [Selection::Cyclic, Selection::Random] {
            let mut model = Lasso::new(LassoParams { selection, ..LassoParams::default() });
            model.fit(x.view(), y.view()).unwrap();
            assert_abs_diff_eq!(model.coef()[0], 3.0, epsilon = 1e-2);
            assert!(model.coef()[1].abs() < 1e-2);
        }
    }

    #[test]
    fn same_seed_same_fit() {
        let x = Array2::from_shape_fn((50, 3), |(i, j)| ((i * (j + 2)) as f64 * 0.13).sin());
        let y = Array1::from_shape_fn(50, |i| (i as f64 * 0.2).cos());
        let fit = |seed| {
            let mut m = Lasso::new(LassoParams { seed, ..LassoParams::default() });
            m.fit(x.view(), y.view()).unwrap();
            m.coef().to_vec()
        };
        assert_eq!(fit(7), fit(7));
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = Lasso::new(LassoParams::default());
        let x = Array2::<f64>::zeros((3, 1));
        assert!(model.predict(x.view()).is_err());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(matches!(
            fit_and_predict(&[1.0, 2.0, 3.0], &[1.0, 2.0], &LassoParams::default()),
            Err(ZdffError::LengthMismatch { reference: 3, signal: 2 })
        ));
    }
}
