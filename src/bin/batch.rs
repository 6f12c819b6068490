use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use atr_percentile::analysis::{Analysis, analyze_many};
use atr_percentile::config::AnalysisConfig;
use atr_percentile::data::{AnalysisPeriod, PriceBar, load_bars, trim_to_period};
use atr_percentile::logging::init_logging;
use atr_percentile::output::{batch_header, batch_line, sort_by_percentile};

/// Rank several symbols by current ATR percentile.
/// Each input CSV is one symbol, named after its file stem.
#[derive(Debug, Parser)]
struct Args {
    /// CSV files (timestamp,open,high,low,close)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Optional config file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// ATR smoothing length
    #[arg(long)]
    atr_length: Option<usize>,

    /// Percentile lookback window in bars
    #[arg(long)]
    lookback: Option<usize>,

    /// History to analyse: 3mo, 6mo, 1y, 2y or max
    #[arg(long)]
    period: Option<AnalysisPeriod>,
}

fn main() -> Result<()> {
    init_logging("warn");
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(v) = args.atr_length {
        cfg.atr_length = v;
    }
    if let Some(v) = args.lookback {
        cfg.lookback = v;
    }
    if let Some(v) = args.period {
        cfg.period = v;
    }
    cfg.validate()?;

    let mut loaded: Vec<(String, Vec<PriceBar>)> = Vec::new();
    let mut load_failures: Vec<(String, String)> = Vec::new();
    for path in &args.inputs {
        let symbol = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| path.display().to_string());
        match load_bars(path) {
            Ok(bars) => {
                let bars = trim_to_period(&bars, cfg.period).to_vec();
                loaded.push((symbol, bars));
            }
            Err(err) => {
                warn!(symbol = %symbol, "failed to load: {err:#}");
                load_failures.push((symbol, format!("{err:#}")));
            }
        }
    }

    let mut results: Vec<(String, Result<Analysis, String>)> = analyze_many(&loaded, &cfg)
        .into_iter()
        .map(|(symbol, result)| (symbol, result.map_err(|err| err.to_string())))
        .collect();
    results.extend(
        load_failures
            .into_iter()
            .map(|(symbol, err)| (symbol, Err(err))),
    );

    sort_by_percentile(&mut results);

    println!("{}", batch_header());
    for (symbol, result) in &results {
        println!("{}", batch_line(symbol, result));
    }

    Ok(())
}
