use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zdff::{get_zdff_steps, PipelineConfig, Warning, WindowKind};

#[derive(Parser)]
#[command(name = "zdff", about = "zdFF extraction for dual-wavelength fiber photometry")]
struct Args {
    /// Recording JSON: {"reference": [...], "signal": [...]}
    #[arg(long)]
    input: PathBuf,

    /// Output JSON path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pipeline config JSON; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Smoothing window length in samples (default: 10)
    #[arg(long)]
    smooth_win: Option<usize>,

    /// Smoothing kernel: flat, hanning, hamming, bartlett, blackman
    #[arg(long)]
    window: Option<WindowKind>,

    /// airPLS smoothness penalty (default: 5e4)
    #[arg(long)]
    lambda: Option<f64>,

    /// airPLS iteration cap (default: 50)
    #[arg(long)]
    itermax: Option<usize>,

    /// Lasso L1 penalty (default: 1e-4)
    #[arg(long)]
    alpha: Option<f64>,

    /// Lasso random-selection seed (default: 9999)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct Recording {
    reference: Vec<f64>,
    signal: Vec<f64>,
}

#[derive(Serialize)]
struct Output<'a> {
    zdff: &'a [f64],
    coef: f64,
    intercept: f64,
    warnings: &'a [Warning],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PipelineConfig::from_json(&text).context("parsing pipeline config")?
        }
        None => PipelineConfig::default(),
    };
    if let Some(v) = args.smooth_win { cfg.smooth_win = v; }
    if let Some(v) = args.window { cfg.window = v; }
    if let Some(v) = args.lambda { cfg.lambda = v; }
    if let Some(v) = args.itermax { cfg.itermax = v; }
    if let Some(v) = args.alpha { cfg.lasso.alpha = v; }
    if let Some(v) = args.seed { cfg.lasso.seed = v; }

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let rec: Recording = serde_json::from_slice(&bytes).context("parsing recording JSON")?;
    ensure!(
        rec.reference.len() == rec.signal.len(),
        "reference has {} frames but signal has {}; truncate before analysis",
        rec.reference.len(),
        rec.signal.len()
    );
    info!("Loaded {} frames from {}", rec.reference.len(), args.input.display());

    let steps = get_zdff_steps(&rec.reference, &rec.signal, &cfg)?;
    if !steps.warnings.is_empty() {
        info!("{} warning(s) recorded in the output", steps.warnings.len());
    }

    let out = Output {
        zdff: &steps.zdff,
        coef: steps.regression.coef()[0],
        intercept: steps.regression.intercept(),
        warnings: &steps.warnings,
    };
    let json = serde_json::to_vec_pretty(&out)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Written → {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}
