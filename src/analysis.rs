use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info_span};

use crate::config::AnalysisConfig;
use crate::data::{PriceBar, check_bar_quality};
use crate::error::IndicatorError;
use crate::indicators::{smooth_atr, true_range};
use crate::score::{AnalysisResult, extract_score};

/// Every derived series for one price history, index-aligned with the bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub timestamps: Vec<DateTime<Utc>>,
    pub closes: Vec<f64>,
    pub true_range: Vec<f64>,
    pub atr: Vec<f64>,
    pub percentile: Vec<Option<f64>>,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesRow {
    pub ts: DateTime<Utc>,
    pub close: f64,
    pub atr: f64,
    pub atr_percentile: Option<f64>,
}

impl Analysis {
    pub fn len(&self) -> usize {
        self.atr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atr.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    pub fn rows(&self) -> impl DoubleEndedIterator<Item = SeriesRow> + '_ {
        (0..self.len()).map(|i| SeriesRow {
            ts: self.timestamps[i],
            close: self.closes[i],
            atr: self.atr[i],
            atr_percentile: self.percentile[i],
        })
    }

    /// Last `n` rows with a defined percentile, most recent first.
    pub fn tail(&self, n: usize) -> Vec<SeriesRow> {
        self.rows()
            .rev()
            .filter(|row| row.atr_percentile.is_some())
            .take(n)
            .collect()
    }
}

/// Run the whole indicator chain over `bars`.
///
/// `bars` must already be chronological and trimmed to the analysis period.
pub fn analyze(bars: &[PriceBar], cfg: &AnalysisConfig) -> Result<Analysis, IndicatorError> {
    cfg.validate()?;
    if bars.is_empty() {
        return Err(IndicatorError::EmptySeries);
    }
    let ranker = cfg.ranker()?;

    let _span = info_span!(
        "analyze",
        bars = bars.len(),
        atr_length = cfg.atr_length,
        lookback = ranker.lookback(),
        min_samples = ranker.min_samples()
    )
    .entered();

    check_bar_quality(bars);

    let tr = true_range(bars);
    let atr = smooth_atr(&tr, cfg.atr_length)?;
    let percentile = ranker.rank(&atr);
    let result = extract_score(&atr, &percentile)?;

    debug!(
        defined = percentile.iter().filter(|p| p.is_some()).count(),
        score = result.score,
        percentile = ?result.percentile,
        "analysis complete"
    );

    Ok(Analysis {
        timestamps: bars.iter().map(|b| b.ts).collect(),
        closes: bars.iter().map(|b| b.close).collect(),
        true_range: tr,
        atr,
        percentile,
        result,
    })
}

/// Analyse independent price histories in parallel. Output order follows input order.
pub fn analyze_many<K>(
    inputs: &[(K, Vec<PriceBar>)],
    cfg: &AnalysisConfig,
) -> Vec<(K, Result<Analysis, IndicatorError>)>
where
    K: Clone + Send + Sync,
{
    inputs
        .par_iter()
        .map(|(key, bars)| (key.clone(), analyze(bars, cfg)))
        .collect()
}
