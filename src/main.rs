use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use std::path::PathBuf;

use atr_percentile::analysis::analyze;
use atr_percentile::config::AnalysisConfig;
use atr_percentile::data::{AnalysisPeriod, load_bars, trim_to_period};
use atr_percentile::logging::init_logging;
use atr_percentile::output::{Report, print_summary, print_table};

/// ATR percentile: where today's volatility sits within its recent history.
#[derive(Debug, Parser)]
struct Args {
    /// Path to the CSV file (timestamp,open,high,low,close)
    #[arg(long)]
    input: PathBuf,

    /// Label for the output (defaults to the input file name)
    #[arg(long)]
    symbol: Option<String>,

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

    /// Print a JSON report instead of the text summary
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Skip the recent-bars table
    #[arg(long, default_value_t = false)]
    no_table: bool,
}

fn main() -> Result<()> {
    init_logging("info");
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

    let symbol = args.symbol.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    });

    let bars = load_bars(&args.input)
        .with_context(|| format!("failed to load bars from {:?}", args.input))?;
    if bars.is_empty() {
        println!("Unable to fetch data: no bars found in CSV.");
        return Ok(());
    }

    let bars = trim_to_period(&bars, cfg.period);
    info!(
        symbol = %symbol,
        bars = bars.len(),
        period = %cfg.period,
        atr_length = cfg.atr_length,
        lookback = cfg.lookback,
        "analysing"
    );

    let analysis = analyze(bars, &cfg)?;

    if args.json {
        let report = Report::new(&symbol, &analysis, &cfg);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(&symbol, &analysis);
    if !args.no_table {
        print_table(&analysis);
    }

    Ok(())
}
