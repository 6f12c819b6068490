use anyhow::{Context, Result, bail};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// One CSV row. Accepts lowercase headers as well as the capitalised
/// `Date,Open,High,Low,Close,Volume` export layout; extra columns are ignored.
#[derive(Debug, Deserialize)]
pub struct BarRow {
    #[serde(alias = "Date", alias = "Datetime", alias = "date", alias = "Timestamp")]
    pub timestamp: String,
    #[serde(alias = "Open")]
    pub open: f64,
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Low")]
    pub low: f64,
    #[serde(alias = "Close")]
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBar {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS+hh:mm` or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("failed to parse timestamp: {raw}"))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Load OHLC bars from a CSV file.
///
/// Bars come back in chronological order. When a timestamp repeats, the row
/// that appears last in the file wins.
pub fn load_bars(input: &Path) -> Result<Vec<PriceBar>> {
    let file =
        File::open(input).with_context(|| format!("failed to open input file: {:?}", input))?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut bars: Vec<PriceBar> = Vec::new();

    for (line, result) in rdr.deserialize::<BarRow>().enumerate() {
        let row: BarRow = result.with_context(|| "failed to deserialize CSV row")?;
        let ts = parse_timestamp(&row.timestamp)?;
        if ![row.open, row.high, row.low, row.close]
            .iter()
            .all(|v| v.is_finite())
        {
            bail!("non-finite price in data row {} ({})", line + 1, row.timestamp);
        }
        bars.push(PriceBar {
            ts,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
        });
    }

    debug!(path = ?input, rows = bars.len(), "read price rows");
    Ok(normalize(bars))
}

/// Sort by timestamp and drop duplicates, keeping the later row.
pub fn normalize(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    // Stable sort keeps file order among equal timestamps.
    bars.sort_by_key(|b| b.ts);

    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.ts == bar.ts => {
                warn!(ts = %bar.ts, "duplicate timestamp, keeping the later row");
                *prev = bar;
            }
            _ => out.push(bar),
        }
    }
    out
}

/// Indices of bars whose high is below their low. Each one is logged.
pub fn check_bar_quality(bars: &[PriceBar]) -> Vec<usize> {
    bars.iter()
        .enumerate()
        .filter(|(_, b)| b.high < b.low)
        .map(|(i, b)| {
            warn!(index = i, ts = %b.ts, high = b.high, low = b.low, "bar has high < low");
            i
        })
        .collect()
}

/// How much trailing history to analyse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnalysisPeriod {
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    Max,
}

impl AnalysisPeriod {
    fn months(self) -> Option<u32> {
        match self {
            Self::ThreeMonths => Some(3),
            Self::SixMonths => Some(6),
            Self::OneYear => Some(12),
            Self::TwoYears => Some(24),
            Self::Max => None,
        }
    }
}

impl FromStr for AnalysisPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "max" => Ok(Self::Max),
            other => Err(format!(
                "unknown period '{other}' (expected 3mo, 6mo, 1y, 2y or max)"
            )),
        }
    }
}

impl TryFrom<String> for AnalysisPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnalysisPeriod> for String {
    fn from(value: AnalysisPeriod) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::Max => "max",
        };
        f.write_str(s)
    }
}

/// Keep the bars that fall within `period` of the most recent bar.
/// Expects chronologically sorted input.
pub fn trim_to_period(bars: &[PriceBar], period: AnalysisPeriod) -> &[PriceBar] {
    let (Some(months), Some(last)) = (period.months(), bars.last()) else {
        return bars;
    };
    let Some(cutoff) = last.ts.checked_sub_months(Months::new(months)) else {
        return bars;
    };
    let start = bars.partition_point(|b| b.ts < cutoff);
    &bars[start..]
}

#[cfg(test)]
pub(crate) fn test_bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    use chrono::{Duration, TimeZone};

    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid datetime");
    PriceBar {
        ts: base + Duration::days(day),
        open,
        high,
        low,
        close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "atr_percentile_{}_{}.csv",
            name,
            std::process::id()
        ));
        let mut file = File::create(&path).expect("create temp csv");
        file.write_all(contents.as_bytes()).expect("write temp csv");
        path
    }

    #[test]
    fn test_parse_timestamp_accepts_rfc3339() {
        let ts = parse_timestamp("2025-11-28T10:15:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 11, 28, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_accepts_offset_with_space_separator() {
        let ts = parse_timestamp("2024-01-02 00:00:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_accepts_bare_date() {
        let ts = parse_timestamp("2024-03-15").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_bars_reads_lowercase_headers_and_sorts() {
        let path = write_csv(
            "lower",
            "timestamp,open,high,low,close\n\
             2024-01-03,11,12,10,11.5\n\
             2024-01-02,10,11,9,10.5\n",
        );
        let bars = load_bars(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert!(bars[0].ts < bars[1].ts);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].high, 12.0);
    }

    #[test]
    fn test_load_bars_reads_capitalized_headers_and_ignores_volume() {
        let path = write_csv(
            "upper",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02 00:00:00-05:00,10,11,9,10.5,12345\n",
        );
        let bars = load_bars(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].low, 9.0);
    }

    #[test]
    fn test_load_bars_rejects_non_finite_prices() {
        let path = write_csv(
            "nan",
            "timestamp,open,high,low,close\n2024-01-02,10,NaN,9,10\n",
        );
        let result = load_bars(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_bars_missing_file_is_error() {
        let path = std::env::temp_dir().join("atr_percentile_does_not_exist.csv");
        assert!(load_bars(&path).is_err());
    }

    #[test]
    fn test_normalize_keeps_later_duplicate() {
        let first = test_bar(1, 10.0, 11.0, 9.0, 10.0);
        let second = test_bar(1, 20.0, 21.0, 19.0, 20.0);
        let earlier = test_bar(0, 5.0, 6.0, 4.0, 5.0);

        let out = normalize(vec![first, earlier, second]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], earlier);
        assert_eq!(out[1], second);
    }

    #[test]
    fn test_check_bar_quality_flags_inverted_bars() {
        let bars = vec![
            test_bar(0, 10.0, 11.0, 9.0, 10.0),
            test_bar(1, 10.0, 9.0, 11.0, 10.0),
            test_bar(2, 10.0, 10.0, 10.0, 10.0),
        ];
        assert_eq!(check_bar_quality(&bars), vec![1]);
    }

    #[test]
    fn test_analysis_period_parses_known_values() {
        assert_eq!("3mo".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::ThreeMonths));
        assert_eq!("6MO".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::SixMonths));
        assert_eq!("1y".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::OneYear));
        assert_eq!("2y".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::TwoYears));
        assert_eq!("max".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::Max));
        assert!("5y".parse::<AnalysisPeriod>().is_err());
    }

    #[test]
    fn test_analysis_period_display_round_trips_through_from_str() {
        let p = AnalysisPeriod::SixMonths;
        assert_eq!(p.to_string().parse::<AnalysisPeriod>(), Ok(p));
    }

    #[test]
    fn test_trim_to_period_keeps_trailing_window() {
        // 400 daily bars starting 2024-01-01; last is 2025-02-03.
        let bars: Vec<PriceBar> = (0..400).map(|d| test_bar(d, 1.0, 1.0, 1.0, 1.0)).collect();
        let last = bars[399].ts;

        let trimmed = trim_to_period(&bars, AnalysisPeriod::ThreeMonths);
        let cutoff = last.checked_sub_months(Months::new(3)).unwrap();
        assert!(trimmed.iter().all(|b| b.ts >= cutoff));
        assert_eq!(trimmed.last(), bars.last());
        assert!(trimmed.len() < bars.len());
        assert!(bars[bars.len() - trimmed.len() - 1].ts < cutoff);
    }

    #[test]
    fn test_trim_to_period_max_keeps_everything() {
        let bars: Vec<PriceBar> = (0..10).map(|d| test_bar(d, 1.0, 1.0, 1.0, 1.0)).collect();
        assert_eq!(trim_to_period(&bars, AnalysisPeriod::Max).len(), 10);
    }

    #[test]
    fn test_trim_to_period_short_history_keeps_everything() {
        let bars: Vec<PriceBar> = (0..10).map(|d| test_bar(d, 1.0, 1.0, 1.0, 1.0)).collect();
        assert_eq!(trim_to_period(&bars, AnalysisPeriod::OneYear).len(), 10);
    }

    #[test]
    fn test_trim_to_period_empty_input() {
        assert!(trim_to_period(&[], AnalysisPeriod::OneYear).is_empty());
    }
}
