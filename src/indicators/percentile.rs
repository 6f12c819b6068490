use crate::error::IndicatorError;

/// Rolling empirical-CDF rank of each value within its trailing window.
///
/// The window ending at index `i` holds the last `min(i + 1, lookback)` values,
/// current one included. Rank is `count(window <= current) / len * 100`, so
/// the current value always counts itself and a defined rank is never 0.
/// Windows shorter than `min_samples` rank as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentileRanker {
    lookback: usize,
    min_samples: usize,
}

impl PercentileRanker {
    pub fn new(lookback: usize, min_samples: usize) -> Result<Self, IndicatorError> {
        if min_samples < 1 {
            return Err(IndicatorError::invalid(
                "min_samples",
                min_samples,
                "must be at least 1",
            ));
        }
        if lookback < min_samples {
            return Err(IndicatorError::invalid(
                "lookback",
                lookback,
                format!("must be >= min_samples ({min_samples})"),
            ));
        }
        Ok(Self {
            lookback,
            min_samples,
        })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Rank every element, keeping the trailing window sorted so each step
    /// costs O(log W) comparisons. Produces exactly the same values as
    /// [`rank_naive`](Self::rank_naive).
    pub fn rank(&self, values: &[f64]) -> Vec<Option<f64>> {
        // Binary search needs a total order; NaN breaks it.
        if values.iter().any(|v| v.is_nan()) {
            return self.rank_naive(values);
        }

        let mut out = Vec::with_capacity(values.len());
        let mut window: Vec<f64> = Vec::with_capacity(self.lookback.min(values.len()));

        for (i, &v) in values.iter().enumerate() {
            if i >= self.lookback {
                let old = values[i - self.lookback];
                let pos = window.partition_point(|&x| x < old);
                window.remove(pos);
            }
            let pos = window.partition_point(|&x| x < v);
            window.insert(pos, v);

            if window.len() < self.min_samples {
                out.push(None);
                continue;
            }
            let count = window.partition_point(|&x| x <= v);
            out.push(Some(rank_of(count, window.len())));
        }

        out
    }

    /// Direct O(N * W) evaluation of the window definition.
    pub fn rank_naive(&self, values: &[f64]) -> Vec<Option<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let start = (i + 1).saturating_sub(self.lookback);
                let window = &values[start..=i];
                if window.len() < self.min_samples {
                    return None;
                }
                let count = window.iter().filter(|&&x| x <= v).count();
                Some(rank_of(count, window.len()))
            })
            .collect()
    }
}

fn rank_of(count: usize, len: usize) -> f64 {
    count as f64 / len as f64 * 100.0
}
