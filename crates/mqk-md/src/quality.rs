//! Data-quality gate for normalized candles: duplicate detection,
//! monotonicity checks, and gap detection against the interval's expected
//! step — the same checks the feed's dedup-on-cache-boundary guarantee
//! relies on (§4.6). Accepts a slice of [`Candle`] and produces a
//! [`QualityReport`]; performs no fetching or normalization itself.

use std::collections::BTreeMap;
use std::fmt;

use mqk_schemas::Candle;

fn expected_step_ms(interval: &str) -> Option<i64> {
    match interval {
        "1m" => Some(60_000),
        "5m" => Some(300_000),
        "15m" => Some(900_000),
        "1h" => Some(3_600_000),
        "1d" | "1D" => Some(86_400_000),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BarKey {
    pub symbol: String,
    pub interval: String,
    pub timestamp_ms: i64,
}

impl fmt::Display for BarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.symbol, self.interval, self.timestamp_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: String,
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.symbol, self.interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIssue {
    pub key: BarKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonotonicityIssue {
    pub series: SeriesKey,
    pub timestamp_ms: i64,
    pub prev_timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapIssue {
    pub series: SeriesKey,
    pub prev_timestamp_ms: i64,
    pub next_timestamp_ms: i64,
    pub delta_ms: i64,
    pub expected_step_ms: i64,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total_bars: usize,
    pub earliest_timestamp_ms: Option<i64>,
    pub latest_timestamp_ms: Option<i64>,
    pub unknown_interval_series_count: usize,
    pub duplicates: Vec<DuplicateIssue>,
    pub monotonicity_violations: Vec<MonotonicityIssue>,
    pub gaps: Vec<GapIssue>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.monotonicity_violations.is_empty() && self.gaps.is_empty()
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QualityReport {{")?;
        writeln!(f, "  total_bars: {}", self.total_bars)?;
        writeln!(
            f,
            "  earliest_timestamp_ms: {}",
            self.earliest_timestamp_ms.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
        )?;
        writeln!(
            f,
            "  latest_timestamp_ms: {}",
            self.latest_timestamp_ms.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
        )?;
        writeln!(f, "  unknown_interval_series: {}", self.unknown_interval_series_count)?;
        writeln!(f, "  duplicates: {}", self.duplicates.len())?;
        for d in &self.duplicates {
            writeln!(f, "    key={} count={}", d.key, d.count)?;
        }
        writeln!(f, "  monotonicity_violations: {}", self.monotonicity_violations.len())?;
        for m in &self.monotonicity_violations {
            writeln!(f, "    series={} ts={} prev={}", m.series, m.timestamp_ms, m.prev_timestamp_ms)?;
        }
        writeln!(f, "  gaps: {}", self.gaps.len())?;
        for g in &self.gaps {
            writeln!(
                f,
                "    series={} prev={} next={} delta={}ms expected={}ms",
                g.series, g.prev_timestamp_ms, g.next_timestamp_ms, g.delta_ms, g.expected_step_ms
            )?;
        }
        write!(f, "}}")
    }
}

/// Build a [`QualityReport`] from a slice of candles. Deterministic: sorts
/// internally, so report contents do not depend on input order.
pub fn build_quality_report(bars: &[Candle]) -> QualityReport {
    let total_bars = bars.len();
    let earliest_timestamp_ms = bars.iter().map(|b| b.timestamp_ms).min();
    let latest_timestamp_ms = bars.iter().map(|b| b.timestamp_ms).max();

    let mut key_counts: BTreeMap<BarKey, usize> = BTreeMap::new();
    for bar in bars {
        let key = BarKey {
            symbol: bar.symbol.clone(),
            interval: bar.interval.clone(),
            timestamp_ms: bar.timestamp_ms,
        };
        *key_counts.entry(key).or_insert(0) += 1;
    }
    let duplicates: Vec<DuplicateIssue> =
        key_counts.into_iter().filter(|(_, count)| *count >= 2).map(|(key, count)| DuplicateIssue { key, count }).collect();

    let mut series_map: BTreeMap<SeriesKey, Vec<i64>> = BTreeMap::new();
    let mut unknown_interval_series: std::collections::BTreeSet<SeriesKey> = std::collections::BTreeSet::new();

    for bar in bars {
        let sk = SeriesKey { symbol: bar.symbol.clone(), interval: bar.interval.clone() };
        series_map.entry(sk.clone()).or_default().push(bar.timestamp_ms);
        if expected_step_ms(&bar.interval).is_none() {
            unknown_interval_series.insert(sk);
        }
    }

    for timestamps in series_map.values_mut() {
        timestamps.sort_unstable();
    }

    let unknown_interval_series_count = unknown_interval_series.len();

    let mut monotonicity_violations: Vec<MonotonicityIssue> = Vec::new();
    let mut gaps: Vec<GapIssue> = Vec::new();

    for (series, timestamps) in &series_map {
        let step = expected_step_ms(&series.interval);
        for window in timestamps.windows(2) {
            let prev = window[0];
            let next = window[1];

            if next <= prev {
                monotonicity_violations.push(MonotonicityIssue {
                    series: series.clone(),
                    timestamp_ms: next,
                    prev_timestamp_ms: prev,
                });
            }

            if let Some(expected) = step {
                if next > prev {
                    let delta = next - prev;
                    if delta > expected {
                        gaps.push(GapIssue {
                            series: series.clone(),
                            prev_timestamp_ms: prev,
                            next_timestamp_ms: next,
                            delta_ms: delta,
                            expected_step_ms: expected,
                        });
                    }
                }
            }
        }
    }

    QualityReport {
        total_bars,
        earliest_timestamp_ms,
        latest_timestamp_ms,
        unknown_interval_series_count,
        duplicates,
        monotonicity_violations,
        gaps,
    }
}
