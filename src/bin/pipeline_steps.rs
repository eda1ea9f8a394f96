/// pipeline_steps: run each zdFF stage separately with timings and optionally
/// dump every intermediate series to JSON.
///
/// Output keys (with --dump):
///   reference / signal   smoothed, baseline, detrended, standardized, ...
///   regression           fitted coefficient, intercept, sweeps
///   predicted            artifact component from the reference
///   zdff                 final trace
///   warnings             non-convergence reports
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::PathBuf;

use zdff::{
    align::fit_reference,
    baseline::air_pls,
    normalize::standardize_with_scale,
    smooth::smooth,
    ChannelSteps, PipelineConfig, PipelineSteps, Warning,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Recording JSON {"reference": [...], "signal": [...]}; synthetic data if omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Length of the synthetic recording
    #[arg(long, default_value_t = 20_000)]
    synthetic_len: usize,

    /// Write every intermediate series here as JSON
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Pipeline config JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Recording {
    reference: Vec<f64>,
    signal: Vec<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => PipelineConfig::from_json(
            &std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        )?,
        None => PipelineConfig::default(),
    };

    let rec = match &args.input {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice(&bytes).context("parsing recording JSON")?
        }
        None => synthetic(args.synthetic_len),
    };
    let n = rec.reference.len();

    // ── 1. Smooth ──────────────────────────────────────────────────────────
    let t = now();
    let r_smooth = smooth(&rec.reference, cfg.smooth_win, cfg.window)?;
    let s_smooth = smooth(&rec.signal, cfg.smooth_win, cfg.window)?;
    let ms_smooth = t.elapsed().as_secs_f64() * 1000.0;

    // ── 2. airPLS baseline ─────────────────────────────────────────────────
    let t = now();
    let r_fit = air_pls(&r_smooth, &cfg.air_pls())?;
    let s_fit = air_pls(&s_smooth, &cfg.air_pls())?;
    let ms_base = t.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Standardise ─────────────────────────────────────────────────────
    let t = now();
    let detrend = |x: &[f64], b: &[f64]| -> Vec<f64> { x.iter().zip(b).map(|(a, b)| a - b).collect() };
    let scale = |x: &[f64]| x.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let r_detrended = detrend(&r_smooth, &r_fit.baseline);
    let s_detrended = detrend(&s_smooth, &s_fit.baseline);
    let r_std = standardize_with_scale(&r_detrended, scale(&r_smooth), "reference")?;
    let s_std = standardize_with_scale(&s_detrended, scale(&s_smooth), "signal")?;
    let ms_std = t.elapsed().as_secs_f64() * 1000.0;

    // ── 4. Align ───────────────────────────────────────────────────────────
    let t = now();
    let model = fit_reference(&r_std, &s_std, &cfg.lasso)?;
    let ms_align = t.elapsed().as_secs_f64() * 1000.0;

    // Parsed by compare scripts.
    eprintln!(
        "TIMING smooth={ms_smooth:.4}ms baseline={ms_base:.4}ms standardize={ms_std:.4}ms align={ms_align:.4}ms"
    );
    info!(
        "{n} frames → {} samples; airPLS {}/{} iterations; beta = {:.4}, intercept = {:.4}",
        r_smooth.len(),
        r_fit.iterations,
        s_fit.iterations,
        model.coef()[0],
        model.intercept()
    );

    if let Some(path) = &args.dump {
        let mut warnings = Vec::new();
        for (channel, fit) in [("reference", &r_fit), ("signal", &s_fit)] {
            if !fit.converged {
                warnings.push(Warning::BaselineNotConverged { channel, iterations: fit.iterations });
            }
        }
        if !model.converged() {
            warnings.push(Warning::RegressionNotConverged { iterations: model.n_iter() });
        }
        let (beta, intercept) = (model.coef()[0], model.intercept());
        let predicted: Vec<f64> = r_std.iter().map(|r| beta * r + intercept).collect();
        let zdff: Vec<f64> = s_std.iter().zip(&predicted).map(|(s, p)| s - p).collect();

        let steps = PipelineSteps {
            reference: ChannelSteps {
                smoothed: r_smooth,
                baseline: r_fit.baseline,
                baseline_iterations: r_fit.iterations,
                baseline_converged: r_fit.converged,
                detrended: r_detrended,
                standardized: r_std,
            },
            signal: ChannelSteps {
                smoothed: s_smooth,
                baseline: s_fit.baseline,
                baseline_iterations: s_fit.iterations,
                baseline_converged: s_fit.converged,
                detrended: s_detrended,
                standardized: s_std,
            },
            regression: model,
            predicted,
            zdff,
            warnings,
        };
        let json = serde_json::to_vec(&steps)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Written → {}", path.display());
    }
    Ok(())
}

/// Bleaching decay + motion artifact on the reference; the signal carries
/// twice the reference plus a slow calcium-like oscillation.
fn synthetic(n: usize) -> Recording {
    let mut rng = StdRng::seed_from_u64(0);
    let tau = std::f64::consts::TAU;
    let reference: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            2.0 + 0.5 * (-t / (n as f64 / 3.0)).exp()
                + 0.2 * (tau * t / 170.0).sin()
                + rng.gen_range(-0.005..0.005)
        })
        .collect();
    let signal = reference
        .iter()
        .enumerate()
        .map(|(i, r)| 2.0 * r + 0.4 * (tau * i as f64 / 97.0).sin() + rng.gen_range(-0.005..0.005))
        .collect();
    Recording { reference, signal }
}

#[inline(always)]
fn now() -> std::time::Instant { std::time::Instant::now() }
