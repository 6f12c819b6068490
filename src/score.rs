use serde::Serialize;

use crate::error::IndicatorError;

/// Percentile above which the volatility score is 1.
pub const SCORE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// 1 when the latest ATR percentile is above 50, else 0
    pub score: u8,
    /// Latest percentile, 1 decimal
    pub percentile: Option<f64>,
    /// Latest ATR, 4 decimals
    pub atr_value: Option<f64>,
}

impl AnalysisResult {
    pub fn undefined() -> Self {
        Self {
            score: 0,
            percentile: None,
            atr_value: None,
        }
    }
}

/// Score the most recent bar.
///
/// An undefined latest percentile yields score 0 with both values undefined,
/// even though an ATR exists.
pub fn extract_score(
    atr: &[f64],
    percentile: &[Option<f64>],
) -> Result<AnalysisResult, IndicatorError> {
    if atr.len() != percentile.len() {
        return Err(IndicatorError::invalid(
            "percentile",
            percentile.len(),
            format!("length must match ATR series length ({})", atr.len()),
        ));
    }
    let (Some(&last_atr), Some(&last_pct)) = (atr.last(), percentile.last()) else {
        return Err(IndicatorError::EmptySeries);
    };

    let Some(pct) = last_pct else {
        return Ok(AnalysisResult::undefined());
    };

    Ok(AnalysisResult {
        score: u8::from(pct > SCORE_THRESHOLD),
        percentile: Some(round_to(pct, 1)),
        atr_value: Some(round_to(last_atr, 4)),
    })
}

/// Round to `decimals` places the way the reference output does: the exact
/// binary value is rounded, and exact ties go to the even digit.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
