use serde::Serialize;

use std::cmp::Ordering;

use crate::analysis::{Analysis, SeriesRow};
use crate::config::AnalysisConfig;
use crate::score::AnalysisResult;

/// Rows shown by [`print_table`].
pub const TABLE_ROWS: usize = 50;

/// Where the latest ATR sits relative to its own recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolatilityBand {
    VeryLow,
    BelowAverage,
    Normal,
    AboveAverage,
    VeryHigh,
}

impl VolatilityBand {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile < 20.0 {
            Self::VeryLow
        } else if percentile < 40.0 {
            Self::BelowAverage
        } else if percentile < 60.0 {
            Self::Normal
        } else if percentile < 80.0 {
            Self::AboveAverage
        } else {
            Self::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low Volatility",
            Self::BelowAverage => "Below Average Volatility",
            Self::Normal => "Normal Volatility",
            Self::AboveAverage => "Above Average Volatility",
            Self::VeryHigh => "Very High Volatility",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::VeryLow => "Potential breakout setup - market is very calm",
            Self::BelowAverage => "Quieter than usual market conditions",
            Self::Normal => "Average market volatility",
            Self::AboveAverage => "More active than usual",
            Self::VeryHigh => "Elevated risk - consider wider stops",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub symbol: &'a str,
    pub atr_length: usize,
    pub lookback: usize,
    pub period: String,
    pub bars: usize,
    pub last_close: Option<f64>,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub band: Option<VolatilityBand>,
    pub recent: Vec<SeriesRow>,
}

impl<'a> Report<'a> {
    pub fn new(symbol: &'a str, analysis: &Analysis, cfg: &AnalysisConfig) -> Self {
        Self {
            symbol,
            atr_length: cfg.atr_length,
            lookback: cfg.lookback,
            period: cfg.period.to_string(),
            bars: analysis.len(),
            last_close: analysis.last_close(),
            result: analysis.result,
            band: analysis.result.percentile.map(VolatilityBand::from_percentile),
            recent: analysis.tail(TABLE_ROWS),
        }
    }
}

pub fn print_summary(symbol: &str, analysis: &Analysis) {
    let result = &analysis.result;

    println!("Symbol:                  {}", symbol);
    if let Some(ts) = analysis.last_timestamp() {
        println!("Last bar:                {}", ts.format("%Y-%m-%d %H:%M"));
    }
    if let Some(close) = analysis.last_close() {
        println!("Current price:           {:.2}", close);
    }
    match result.atr_value {
        Some(atr) => println!("ATR value:               {:.4}", atr),
        None => println!("ATR value:               N/A"),
    }
    println!("Score:                   {}", result.score);

    match result.percentile {
        Some(pct) => {
            let band = VolatilityBand::from_percentile(pct);
            println!("ATR percentile:          {:.1}%", pct);
            println!("Regime:                  {}", band.label());
            println!("                         {}", band.description());
        }
        None => {
            println!("ATR percentile:          N/A");
            println!("Not enough data to calculate ATR percentile. Try a longer period.");
        }
    }
}

pub fn print_table(analysis: &Analysis) {
    let rows = analysis.tail(TABLE_ROWS);
    if rows.is_empty() {
        println!();
        println!("Not enough data to generate charts.");
        return;
    }

    println!();
    println!("{:<17} {:>12} {:>10} {:>9}", "date", "close", "atr", "pct");
    for row in rows {
        let pct = row.atr_percentile.unwrap_or_default();
        println!(
            "{:<17} {:>12.4} {:>10.4} {:>9.1}",
            row.ts.format("%Y-%m-%d %H:%M"),
            row.close,
            row.atr,
            pct
        );
    }
}

/// Highest percentile first. Undefined percentiles and failures go last.
pub fn sort_by_percentile(results: &mut [(String, Result<Analysis, String>)]) {
    results.sort_by(|(_, a), (_, b)| {
        let pa = a.as_ref().ok().and_then(|x| x.result.percentile);
        let pb = b.as_ref().ok().and_then(|x| x.result.percentile);
        match (pa, pb) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

pub fn batch_header() -> String {
    format!(
        "{:<10} {:>6} {:>8} {:>10} {:>5}  {}",
        "symbol", "bars", "pct", "atr", "score", "regime"
    )
}

/// One row of the batch table. Load and analysis failures both render as `error:` rows.
pub fn batch_line(symbol: &str, result: &Result<Analysis, String>) -> String {
    let a = match result {
        Ok(a) => a,
        Err(err) => return format!("{:<10} error: {}", symbol, err),
    };
    let r = &a.result;
    let pct = r
        .percentile
        .map(|p| format!("{:.1}", p))
        .unwrap_or_else(|| "N/A".to_string());
    let atr = r
        .atr_value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "N/A".to_string());
    let regime = r
        .percentile
        .map(|p| VolatilityBand::from_percentile(p).label())
        .unwrap_or("not enough data");
    format!(
        "{:<10} {:>6} {:>8} {:>10} {:>5}  {}",
        symbol,
        a.len(),
        pct,
        atr,
        r.score,
        regime
    )
}
