//! Windowed moving-average low-pass filter.
//!
//! - [`window`]: the closed set of kernel shapes ([`WindowKind`]).
//! - [`convolve`]: mirror padding and "valid" convolution.
//!
//! [`smooth`] mirror-pads the channel by `window_len - 1` samples on each
//! side, convolves with the unit-sum kernel and trims
//! `floor(window_len/2) - 1` samples from the front and `floor(window_len/2)`
//! from the back.  The output therefore has `n` samples for even windows and
//! `n + 1` for odd windows (see [`smoothed_len`]).

pub mod convolve;
pub mod window;

pub use convolve::{convolve_valid, fft_convolve_full, mirror_pad, FFT_MIN_KERNEL};
pub use window::{bartlett, blackman, hamming, hanning, WindowKind};

use crate::error::{Result, ZdffError};

/// Smooth `x` with a `window_len`-tap kernel of shape `kind`.
///
/// Windows shorter than 3 samples leave the input untouched.
///
/// # Errors
///
/// [`ZdffError::InvalidInput`] when `x` has fewer than `window_len` samples.
pub fn smooth(x: &[f64], window_len: usize, kind: WindowKind) -> Result<Vec<f64>> {
    if x.len() < window_len {
        return Err(ZdffError::InvalidInput(format!(
            "input vector needs to be bigger than window size ({} < {window_len})",
            x.len()
        )));
    }
    if window_len < 3 {
        return Ok(x.to_vec());
    }

    let padded = mirror_pad(x, window_len - 1);
    let kernel = kind.kernel(window_len);
    let y = convolve_valid(&padded, &kernel);

    let half = window_len / 2;
    let front = half - 1;
    let back = half;
    Ok(y[front..y.len() - back].to_vec())
}

/// Output length of [`smooth`] for an `n`-sample input.
pub fn smoothed_len(n: usize, window_len: usize) -> usize {
    if window_len < 3 {
        n
    } else {
        n + window_len - 2 * (window_len / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn short_window_is_identity() {
        let x = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(smooth(&x, 2, WindowKind::Flat).unwrap(), x.to_vec());
        assert_eq!(smooth(&x, 0, WindowKind::Hanning).unwrap(), x.to_vec());
    }

    #[test]
    fn too_short_input_is_rejected() {
        let err = smooth(&[1.0, 2.0], 10, WindowKind::Flat).unwrap_err();
        assert!(matches!(err, ZdffError::InvalidInput(_)));
    }

    #[test]
    fn moving_average_of_ramp_reference_values() {
        // np.convolve(np.ones(4)/4, np.r_[x[3:0:-1], x, x[-2:-5:-1]], 'valid')[1:-2]
        // for x = [0..7] gives [1.0, 1.0, 1.5, 2.5, 3.5, 4.5, 5.5, 6.0]
        let x: Vec<f64> = (0..8).map(f64::from).collect();
        let y = smooth(&x, 4, WindowKind::Flat).unwrap();
        let expected = [1.0, 1.0, 1.5, 2.5, 3.5, 4.5, 5.5, 6.0];
        assert_eq!(y.len(), expected.len());
        for (a, b) in y.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn odd_window_adds_one_sample() {
        let x: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let y = smooth(&x, 5, WindowKind::Hamming).unwrap();
        assert_eq!(y.len(), 51);
        assert_eq!(smoothed_len(50, 5), 51);
        assert_eq!(smoothed_len(50, 10), 50);
        assert_eq!(smoothed_len(50, 2), 50);
    }

    #[test]
    fn smoothed_len_matches_smooth_output() {
        let x: Vec<f64> = (0..500).map(|i| (i as f64 * 0.1).cos()).collect();
        for w in [0, 2, 3, 4, 5, 10, 11, 64, 65] {
            let y = smooth(&x, w, WindowKind::Flat).unwrap();
            assert_eq!(y.len(), smoothed_len(x.len(), w), "window {w}");
        }
    }

    #[test]
    fn constant_stays_constant() {
        let x = vec![2.5; 40];
        for kind in WindowKind::ALL {
            let y = smooth(&x, 10, kind).unwrap();
            for v in y {
                assert_abs_diff_eq!(v, 2.5, epsilon = 1e-12);
            }
        }
    }
}
