//! Half-window trend classification for per-day category counts

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::TrendDirection;

/// Default change (percent) between half-window averages that counts as a trend
pub const DEFAULT_TREND_THRESHOLD: f64 = 15.0;

/// Outcome of analyzing one category's series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Change of the later half's average relative to the earlier half's.
    /// 0 when there is too little data or the earlier average is 0.
    pub percentage_change: f64,
}

impl TrendAnalysis {
    fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            percentage_change: 0.0,
        }
    }
}

/// Compares the average of the earliest half of a series against the latest half
#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    threshold: f64,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_TREND_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Classify a chronologically sorted `(date, count)` series.
    ///
    /// With an odd number of points the middle one belongs to neither half.
    pub fn analyze(&self, series: &[(NaiveDate, u64)]) -> TrendAnalysis {
        let counts: Vec<u64> = series.iter().map(|(_, c)| *c).collect();
        self.analyze_counts(&counts)
    }

    /// Same as [`analyze`](Self::analyze) for a bare list of counts
    pub fn analyze_counts(&self, counts: &[u64]) -> TrendAnalysis {
        let n = counts.len();
        if n < 2 {
            return TrendAnalysis::stable();
        }

        let half = n / 2;
        let avg_first = mean(&counts[..half]);
        let avg_second = mean(&counts[n - half..]);

        if avg_first == 0.0 {
            let direction = if avg_second > 0.0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Stable
            };
            return TrendAnalysis {
                direction,
                percentage_change: 0.0,
            };
        }

        let percentage_change = (avg_second - avg_first) / avg_first * 100.0;
        let direction = if percentage_change > self.threshold {
            TrendDirection::Increasing
        } else if percentage_change < -self.threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        TrendAnalysis {
            direction,
            percentage_change,
        }
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
