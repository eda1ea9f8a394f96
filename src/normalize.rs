//! Robust z-score standardisation.
//!
//! `standardize` — `(x - median(x)) / std(x)`, population std (`ddof = 0`).
//!
//! A channel with zero deviation is rejected as degenerate instead of being
//! blown up to unit variance.  [`standardize_with_scale`] additionally
//! rejects deviations negligible next to a caller-supplied scale.
use crate::error::{Result, ZdffError};

/// Deviations at or below `DEGENERATE_RTOL · scale` count as zero variance.
pub const DEGENERATE_RTOL: f64 = 1e-8;

/// Standardise `x` to `(x - median) / std`.
///
/// # Errors
///
/// [`ZdffError::InvalidInput`] for empty input;
/// [`ZdffError::DegenerateInput`] when `x` is constant.
pub fn standardize(x: &[f64]) -> Result<Vec<f64>> {
    standardize_with_scale(x, 0.0, "input")
}

/// As [`standardize`], but judges degeneracy against an external `scale`,
/// typically the magnitude of the channel before detrending.  `channel`
/// labels the error.
pub fn standardize_with_scale(x: &[f64], scale: f64, channel: &'static str) -> Result<Vec<f64>> {
    if x.is_empty() {
        return Err(ZdffError::InvalidInput(format!("cannot standardise an empty {channel} channel")));
    }
    let std = std_dev(x);
    if std == 0.0 || std <= DEGENERATE_RTOL * scale || !std.is_finite() {
        return Err(ZdffError::DegenerateInput { channel, std });
    }
    let med = median(x);
    Ok(x.iter().map(|v| (v - med) / std).collect())
}

/// Median, averaging the two middle values for even lengths.
/// Returns `NaN` for an empty slice.
pub fn median(x: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut v = x.to_vec();
    let mid = n / 2;
    let (lower, m2, _) = v.select_nth_unstable_by(mid, f64::total_cmp);
    let m2 = *m2;
    if n % 2 == 1 {
        m2
    } else {
        let m1 = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        0.5 * (m1 + m2)
    }
}

/// Population standard deviation (`ddof = 0`).
pub fn std_dev(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}
