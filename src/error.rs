//! Error taxonomy for the zdFF pipeline.
//!
//! Fatal conditions are [`ZdffError`] values and abort the call with no
//! partial result.  Iterative solvers that run out of budget are *not*
//! errors: they return their last iterate and surface a [`Warning`].
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ZdffError {
    /// Input too short for the requested window, empty, or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reference and signal channels are not frame-aligned.
    #[error("length mismatch: reference has {reference} samples, signal has {signal}")]
    LengthMismatch { reference: usize, signal: usize },

    /// Zero variance in a channel at the standardisation stage.
    #[error("degenerate input: {channel} channel has zero variance (std = {std:e})")]
    DegenerateInput { channel: &'static str, std: f64 },
}

pub type Result<T> = std::result::Result<T, ZdffError>;

/// Non-fatal conditions reported alongside a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Warning {
    /// airPLS reached `itermax` without meeting the `dssn` threshold.
    BaselineNotConverged { channel: &'static str, iterations: usize },
    /// Coordinate descent reached `max_iter` without meeting `tol`.
    RegressionNotConverged { iterations: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::BaselineNotConverged { channel, iterations } => write!(
                f,
                "{channel} baseline: max iteration reached ({iterations}) before convergence"
            ),
            Warning::RegressionNotConverged { iterations } => write!(
                f,
                "lasso: max_iter reached ({iterations}) before convergence"
            ),
        }
    }
}
