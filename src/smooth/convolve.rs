//! Edge padding and "valid"-mode convolution.
//!
//! Short kernels are convolved directly, summing products in the same order
//! as `np.convolve`.  Kernels of [`FFT_MIN_KERNEL`] taps or more go through
//! overlap-add FFT convolution instead, which agrees with the direct path to
//! within floating-point rounding.
use rustfft::{num_complex::Complex, FftPlanner};

/// Kernel length at which [`convolve_valid`] switches to the FFT path.
pub const FFT_MIN_KERNEL: usize = 64;

/// Mirror padding without repeating the edge sample.
///
/// Left:  `x[k], x[k-1], …, x[1]`
/// Right: `x[n-2], x[n-3], …, x[n-1-k]`
///
/// Requires `k < x.len()`.
pub fn mirror_pad(x: &[f64], k: usize) -> Vec<f64> {
    let n = x.len();
    debug_assert!(k < n, "mirror padding of {k} needs more than {n} samples");

    let mut out = Vec::with_capacity(n + 2 * k);
    out.extend(x[1..=k].iter().rev());
    out.extend_from_slice(x);
    out.extend(x[n - 1 - k..n - 1].iter().rev());
    out
}

/// Convolve `s` with `h`, keeping only samples where the kernel fully
/// overlaps the input.  Output length is `s.len() - h.len() + 1`.
pub fn convolve_valid(s: &[f64], h: &[f64]) -> Vec<f64> {
    let n_s = s.len();
    let n_h = h.len();
    if n_h == 0 || n_s < n_h {
        return vec![];
    }
    if n_h >= FFT_MIN_KERNEL {
        let full = fft_convolve_full(s, h);
        return full[n_h - 1..n_s].to_vec();
    }

    (0..=n_s - n_h)
        .map(|i| {
            h.iter()
                .enumerate()
                .map(|(j, &hj)| s[i + n_h - 1 - j] * hj)
                .sum()
        })
        .collect()
}

/// Full linear convolution via overlap-add.  Output length is
/// `x.len() + h.len() - 1`.
pub fn fft_convolve_full(x: &[f64], h: &[f64]) -> Vec<f64> {
    let n_x = x.len();
    let n_h = h.len();
    if n_x == 0 || n_h == 0 {
        return vec![];
    }
    let n_out = n_x + n_h - 1;

    let n_fft = choose_fft_len(n_h, n_x);
    let n_seg = n_fft - n_h + 1;
    let n_segments = n_x.div_ceil(n_seg);

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);
    let inv_scale = 1.0 / n_fft as f64;

    let mut h_fft = zero_padded(h, n_fft);
    fft_fwd.process(&mut h_fft);

    let mut out = vec![0.0_f64; n_out];
    for seg_idx in 0..n_segments {
        let start = seg_idx * n_seg;
        let stop = (start + n_seg).min(n_x);

        let mut buf = zero_padded(&x[start..stop], n_fft);
        fft_fwd.process(&mut buf);
        for (b, &hf) in buf.iter_mut().zip(h_fft.iter()) {
            *b *= hf;
        }
        fft_inv.process(&mut buf);

        let end = (start + n_fft).min(n_out);
        for (o, b) in out[start..end].iter_mut().zip(buf.iter()) {
            *o += b.re * inv_scale;
        }
    }
    out
}

fn zero_padded(v: &[f64], n: usize) -> Vec<Complex<f64>> {
    v.iter()
        .map(|&re| Complex { re, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n)
        .collect()
}

/// Power-of-two block size minimising
/// `ceil(n_x / (N - n_h + 1)) · N · (log2 N + 1)`.
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;
    let max_pow = ((n_x + n_h) as f64).log2().ceil().max(min_pow as f64) as u32;

    let mut best_n = 1_usize << max_pow;
    let mut best_cost = f64::INFINITY;
    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0);
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mirror_pad_reflects_without_edge() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let p = mirror_pad(&x, 2);
        assert_eq!(p, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn valid_length_and_values() {
        let s = [1.0, 2.0, 3.0, 4.0];
        let h = [1.0, 0.0, -1.0];
        // np.convolve([1,0,-1], [1,2,3,4], 'valid') -> [2, 2]
        let y = convolve_valid(&s, &h);
        assert_eq!(y, vec![2.0, 2.0]);
    }

    #[test]
    fn fft_path_matches_direct_sum() {
        let s: Vec<f64> = (0..700).map(|i| ((i as f64) * 0.37).sin() + 0.01 * i as f64).collect();
        let h: Vec<f64> = (0..97).map(|j| 1.0 + (j as f64 * 0.1).cos()).collect();

        let fast = convolve_valid(&s, &h);
        assert_eq!(fast.len(), s.len() - h.len() + 1);
        for (i, &v) in fast.iter().enumerate() {
            let direct: f64 = h
                .iter()
                .enumerate()
                .map(|(j, &hj)| s[i + h.len() - 1 - j] * hj)
                .sum();
            assert_abs_diff_eq!(v, direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn short_input_gives_empty() {
        assert!(convolve_valid(&[1.0], &[1.0, 1.0]).is_empty());
    }
}
