use crate::error::IndicatorError;

/// Exponentially smoothed True Range with alpha = 1 / `length`.
///
/// Seeded with the first True Range value, then
/// ATR_i = alpha * TR_i + (1 - alpha) * ATR_{i-1} for every later bar.
/// There is no SMA warm-up window.
pub fn smooth_atr(true_range: &[f64], length: usize) -> Result<Vec<f64>, IndicatorError> {
    if length == 0 {
        return Err(IndicatorError::invalid(
            "atr_length",
            length,
            "must be a positive integer",
        ));
    }

    let alpha = 1.0 / length as f64;
    let mut out = Vec::with_capacity(true_range.len());
    let mut prev: Option<f64> = None;

    for &tr in true_range {
        let atr = match prev {
            None => tr,
            Some(p) => alpha * tr + (1.0 - alpha) * p,
        };
        out.push(atr);
        prev = Some(atr);
    }

    Ok(out)
}
