use crate::data::PriceBar;

/// True Range per bar:
/// TR_0 = high_0 - low_0
/// TR_i = max(high_i - low_i, |high_i - close_{i-1}|, |low_i - close_{i-1}|)
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let Some(first) = bars.first() else {
        return out;
    };
    out.push(first.high - first.low);

    for pair in bars.windows(2) {
        let prev_close = pair[0].close;
        let bar = &pair[1];
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        out.push(tr);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_bar as bar;

    #[test]
    fn test_true_range_empty_input_is_empty() {
        assert!(true_range(&[]).is_empty());
    }

    #[test]
    fn test_true_range_first_bar_is_high_minus_low() {
        let bars = vec![bar(0, 10.0, 12.0, 9.0, 11.0)];
        assert_eq!(true_range(&bars), vec![3.0]);
    }

    #[test]
    fn test_true_range_uses_gap_up_from_previous_close() {
        // prev close 10, bar 15..14 => |15-10| = 5 dominates the 1.0 range
        let bars = vec![
            bar(0, 10.0, 10.5, 9.5, 10.0),
            bar(1, 14.5, 15.0, 14.0, 14.8),
        ];
        let tr = true_range(&bars);
        assert_eq!(tr.len(), 2);
        assert_eq!(tr[1], 5.0);
    }

    #[test]
    fn test_true_range_uses_gap_down_from_previous_close() {
        // prev close 20, bar 16..15 => |15-20| = 5
        let bars = vec![
            bar(0, 20.0, 20.0, 20.0, 20.0),
            bar(1, 15.5, 16.0, 15.0, 15.2),
        ];
        assert_eq!(true_range(&bars)[1], 5.0);
    }

    #[test]
    fn test_true_range_inside_bar_is_plain_range() {
        let bars = vec![
            bar(0, 10.0, 12.0, 8.0, 10.0),
            bar(1, 10.0, 11.0, 9.0, 10.5),
        ];
        assert_eq!(true_range(&bars)[1], 2.0);
    }

    #[test]
    fn test_true_range_is_never_negative_for_valid_bars() {
        let bars: Vec<PriceBar> = (0..30)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.7).sin() * 5.0;
                bar(i, base, base + 1.5, base - 0.5, base + 0.2)
            })
            .collect();
        assert!(true_range(&bars).iter().all(|&tr| tr >= 0.0));
    }
}
