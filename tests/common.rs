/// Shared helpers: seeded synthetic recordings and series statistics.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Frame-aligned `(reference, signal)` pair of length `n`.
///
/// reference = 2 + bleaching decay + motion artifact + noise
/// signal    = 2 · reference + calcium-like sine + noise
#[allow(unused)]
pub fn synthetic_recording(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let reference: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            2.0 + bleach(t) + motion_artifact(t) + rng.gen_range(-0.005..0.005)
        })
        .collect();
    let signal: Vec<f64> = reference
        .iter()
        .enumerate()
        .map(|(i, r)| 2.0 * r + calcium(i as f64) + rng.gen_range(-0.005..0.005))
        .collect();
    (reference, signal)
}

#[allow(unused)]
pub fn bleach(t: f64) -> f64 {
    0.5 * (-t / 400.0).exp()
}

#[allow(unused)]
pub fn motion_artifact(t: f64) -> f64 {
    0.3 * (2.0 * PI * t / 170.0).sin() + 0.2 * (2.0 * PI * t / 53.0 + 1.0).sin()
}

#[allow(unused)]
pub fn calcium(t: f64) -> f64 {
    0.4 * (2.0 * PI * t / 97.0).sin()
}

#[allow(unused)]
/// `level + uniform(-amp, amp)` noise.
pub fn noisy_flat(n: usize, level: f64, amp: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| level + rng.gen_range(-amp..amp)).collect()
}

#[allow(unused)]
/// Pearson correlation coefficient.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let ma = a.iter().sum::<f64>() / n as f64;
    let mb = b.iter().sum::<f64>() / n as f64;
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    cov / (va * vb).sqrt()
}

#[allow(unused)]
/// Maximum absolute difference between two series.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
