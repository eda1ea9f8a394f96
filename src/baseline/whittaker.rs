//! Weighted Whittaker smoother with a first-order difference penalty.
//!
//! Solves `(W + λ·DᵀD) z = W x` where `W = diag(w)` and `D` is the
//! `(m-1) × m` first-difference operator.  `DᵀD` is tridiagonal
//! (`[1, 2, …, 2, 1]` on the diagonal, `-1` off it), so the system is solved
//! in O(m) with the Thomas algorithm.  The matrix is diagonally dominant for
//! non-negative weights, which keeps the elimination stable without pivoting.
use crate::error::{Result, ZdffError};

/// Penalised weighted smooth of `x`.
///
/// # Errors
///
/// [`ZdffError::InvalidInput`] if `x` is empty, `w` has a different length,
/// or the system is singular (e.g. every weight is zero).
pub fn smooth_weighted(x: &[f64], w: &[f64], lambda: f64) -> Result<Vec<f64>> {
    let m = x.len();
    if m == 0 {
        return Err(ZdffError::InvalidInput("cannot smooth an empty sequence".into()));
    }
    if w.len() != m {
        return Err(ZdffError::InvalidInput(format!(
            "weight vector has {} entries for {m} samples",
            w.len()
        )));
    }

    let mut diag: Vec<f64> = w.to_vec();
    if m > 1 {
        diag[0] += lambda;
        diag[m - 1] += lambda;
        for d in &mut diag[1..m - 1] {
            *d += 2.0 * lambda;
        }
    }
    let off = vec![-lambda; m.saturating_sub(1)];
    let rhs: Vec<f64> = x.iter().zip(w).map(|(xi, wi)| xi * wi).collect();

    solve_symmetric_tridiagonal(&diag, &off, &rhs)
}

/// Thomas algorithm for a symmetric tridiagonal system.
///
/// `diag` has `n` entries, `off` has `n - 1` (shared by the sub- and
/// super-diagonal).
pub fn solve_symmetric_tridiagonal(diag: &[f64], off: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = diag.len();
    debug_assert_eq!(off.len() + 1, n);
    debug_assert_eq!(rhs.len(), n);

    let singular = || ZdffError::InvalidInput("penalised system is singular".into());

    let mut cp = vec![0.0_f64; n.saturating_sub(1)];
    let mut dp = vec![0.0_f64; n];

    let mut denom = diag[0];
    if denom == 0.0 {
        return Err(singular());
    }
    if n > 1 {
        cp[0] = off[0] / denom;
    }
    dp[0] = rhs[0] / denom;

    for i in 1..n {
        denom = diag[i] - off[i - 1] * cp[i - 1];
        if denom == 0.0 {
            return Err(singular());
        }
        if i < n - 1 {
            cp[i] = off[i] / denom;
        }
        dp[i] = (rhs[i] - off[i - 1] * dp[i - 1]) / denom;
    }

    let mut z = vec![0.0_f64; n];
    z[n - 1] = dp[n - 1];
    for i in (0..n - 1).rev() {
        z[i] = dp[i] - cp[i] * z[i + 1];
    }
    Ok(z)
}
