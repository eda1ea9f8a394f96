//! Smoothing kernel shapes.
//!
//! Each non-flat kernel matches the corresponding NumPy window function
//! (`np.hanning`, `np.hamming`, `np.bartlett`, `np.blackman`), evaluated on
//! the symmetric grid `n = 1-M, 3-M, …, M-1` exactly as NumPy does, so that
//! smoothed output is bit-compatible with NumPy-based reference traces.
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZdffError;

/// Closed set of kernel shapes accepted by [`crate::smooth::smooth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Uniform weights (moving average).
    Flat,
    Hanning,
    Hamming,
    Bartlett,
    Blackman,
}

impl WindowKind {
    pub const ALL: [WindowKind; 5] = [
        WindowKind::Flat,
        WindowKind::Hanning,
        WindowKind::Hamming,
        WindowKind::Bartlett,
        WindowKind::Blackman,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WindowKind::Flat => "flat",
            WindowKind::Hanning => "hanning",
            WindowKind::Hamming => "hamming",
            WindowKind::Bartlett => "bartlett",
            WindowKind::Blackman => "blackman",
        }
    }

    /// Raw (un-normalised) window samples of length `m`.
    pub fn samples(self, m: usize) -> Vec<f64> {
        match self {
            WindowKind::Flat => vec![1.0; m],
            WindowKind::Hanning => hanning(m),
            WindowKind::Hamming => hamming(m),
            WindowKind::Bartlett => bartlett(m),
            WindowKind::Blackman => blackman(m),
        }
    }

    /// Window of length `m` normalised to unit sum.
    pub fn kernel(self, m: usize) -> Vec<f64> {
        let mut w = self.samples(m);
        let s: f64 = w.iter().sum();
        w.iter_mut().for_each(|v| *v /= s);
        w
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowKind {
    type Err = ZdffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                ZdffError::InvalidInput(format!(
                    "unknown window '{s}'; expected one of 'flat', 'hanning', 'hamming', 'bartlett', 'blackman'"
                ))
            })
    }
}

/// NumPy's symmetric grid `n = 1-m, 3-m, …, m-1`, paired with `m - 1`.
fn grid(m: usize) -> impl Iterator<Item = (f64, f64)> {
    let denom = m as f64 - 1.0;
    (0..m).map(move |i| (2.0 * i as f64 + 1.0 - m as f64, denom))
}

/// Hann window, `0.5 + 0.5·cos(π·n/(M-1))`.
pub fn hanning(m: usize) -> Vec<f64> {
    if m == 1 {
        return vec![1.0];
    }
    grid(m).map(|(n, d)| 0.5 + 0.5 * (PI * n / d).cos()).collect()
}

/// Hamming window, `0.54 + 0.46·cos(π·n/(M-1))`.
pub fn hamming(m: usize) -> Vec<f64> {
    if m == 1 {
        return vec![1.0];
    }
    grid(m).map(|(n, d)| 0.54 + 0.46 * (PI * n / d).cos()).collect()
}

/// Triangular window with zero endpoints.
pub fn bartlett(m: usize) -> Vec<f64> {
    if m == 1 {
        return vec![1.0];
    }
    grid(m)
        .map(|(n, d)| if n <= 0.0 { 1.0 + n / d } else { 1.0 - n / d })
        .collect()
}

/// Blackman window, `0.42 + 0.5·cos(π·n/(M-1)) + 0.08·cos(2π·n/(M-1))`.
pub fn blackman(m: usize) -> Vec<f64> {
    if m == 1 {
        return vec![1.0];
    }
    grid(m)
        .map(|(n, d)| 0.42 + 0.5 * (PI * n / d).cos() + 0.08 * (2.0 * PI * n / d).cos())
        .collect()
}
