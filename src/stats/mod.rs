//! Descriptive statistics over a projected year.

pub mod aggregate;
pub mod report;

use serde::Serialize;
use std::collections::BTreeMap;

pub use aggregate::aggregate;

/// Metric name → mean, `None` where no value contributed.
pub type MetricMeans = BTreeMap<String, Option<f64>>;

/// Row count and per-metric means for one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub metric_means: MetricMeans,
}

impl GroupStats {
    /// Average of the means that exist; zero when none do so such groups
    /// sort last.
    pub fn overall_score(&self) -> f64 {
        let (sum, n) = self
            .metric_means
            .values()
            .flatten()
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }
}

/// Aggregates for one year. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub year: i32,
    pub total_rows: usize,
    pub metric_means: MetricMeans,
    /// Keyed by residence state code.
    pub by_category: BTreeMap<String, GroupStats>,
    pub by_school_type: BTreeMap<String, GroupStats>,
    pub by_income_bracket: BTreeMap<String, GroupStats>,
    /// Presence field name → percentage of all rows marked present.
    pub presence_rate: BTreeMap<String, f64>,
}

impl StatsSummary {
    pub fn mean(&self, metric: &str) -> Option<f64> {
        self.metric_means.get(metric).copied().flatten()
    }
}
