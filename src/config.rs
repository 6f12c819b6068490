use anyhow::{Context, Result};
use serde::Deserialize;

use std::path::Path;

use crate::data::AnalysisPeriod;
use crate::error::IndicatorError;
use crate::indicators::PercentileRanker;

pub const DEFAULT_ATR_LENGTH: usize = 5;
/// 126 trading days ≈ 6 months.
pub const DEFAULT_LOOKBACK: usize = 126;
/// Observations required before a percentile is reported.
pub const MIN_SAMPLES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// ATR smoothing length (alpha = 1 / atr_length)
    pub atr_length: usize,

    /// Trailing window for the percentile rank, in bars
    pub lookback: usize,

    /// How much history to keep before computing
    pub period: AnalysisPeriod,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            atr_length: DEFAULT_ATR_LENGTH,
            lookback: DEFAULT_LOOKBACK,
            period: AnalysisPeriod::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a config file (any format the `config` crate understands).
    /// Keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let filename = path
            .to_str()
            .with_context(|| format!("config path is not valid UTF-8: {:?}", path))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(filename))
            .build()
            .with_context(|| format!("failed to read config file {filename}"))?
            .try_deserialize()
            .with_context(|| format!("failed to deserialize config file {filename}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.atr_length == 0 {
            return Err(IndicatorError::invalid(
                "atr_length",
                self.atr_length,
                "must be a positive integer",
            ));
        }
        self.ranker().map(|_| ())
    }

    pub fn ranker(&self) -> Result<PercentileRanker, IndicatorError> {
        PercentileRanker::new(self.lookback, MIN_SAMPLES)
    }
}
