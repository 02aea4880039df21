//! Views derived from cached summaries for downstream consumers.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{GroupStats, StatsSummary};
use crate::schema::{CanonicalColumn, SchoolType};
use crate::store::YearState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub key: String,
    pub overall_score: f64,
    #[serde(flatten)]
    pub stats: GroupStats,
}

/// Order partitions by the average of their available metric means,
/// descending. Equal scores keep key order.
pub fn rank_groups(groups: &BTreeMap<String, GroupStats>) -> Vec<RankedGroup> {
    let mut ranked: Vec<RankedGroup> = groups
        .iter()
        .map(|(key, stats)| RankedGroup {
            key: key.clone(),
            overall_score: stats.overall_score(),
            stats: stats.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    ranked
}

/// The `n` best states of a year.
pub fn top_categories(summary: &StatsSummary, n: usize) -> Vec<RankedGroup> {
    let mut ranked = rank_groups(&summary.by_category);
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolTypeEntry {
    pub code: String,
    pub label: Option<&'static str>,
    #[serde(flatten)]
    pub stats: GroupStats,
}

/// School-type partitions with labels; documented codes first, then any
/// other code seen in the data.
pub fn school_types(summary: &StatsSummary) -> Vec<SchoolTypeEntry> {
    let known = SchoolType::KNOWN.iter().filter_map(|t| {
        summary
            .by_school_type
            .get(t.code())
            .map(|stats| SchoolTypeEntry {
                code: t.code().to_string(),
                label: Some(t.label()),
                stats: stats.clone(),
            })
    });
    let unknown = summary
        .by_school_type
        .iter()
        .filter(|(code, _)| SchoolType::from_code(code).is_none())
        .map(|(code, stats)| SchoolTypeEntry {
            code: code.clone(),
            label: None,
            stats: stats.clone(),
        });
    known.chain(unknown).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMean {
    pub metric: String,
    pub mean: f64,
}

/// Metrics with a mean, lowest first, at most `n`.
pub fn weakest_metrics(summary: &StatsSummary, n: usize) -> Vec<MetricMean> {
    let mut metrics: Vec<MetricMean> = summary
        .metric_means
        .iter()
        .filter_map(|(metric, mean)| {
            mean.map(|mean| MetricMean {
                metric: metric.clone(),
                mean,
            })
        })
        .collect();
    metrics.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    metrics.truncate(n);
    metrics
}

fn round_to(v: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    (v * scale).round() / scale
}

/// One series per score metric across years. A year without a mean
/// contributes `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub years: Vec<i32>,
    pub metrics: BTreeMap<String, Vec<Option<f64>>>,
}

impl MetricSeries {
    /// Build from summaries in the order given, optionally rounding means.
    pub fn build<'a, I>(summaries: I, digits: Option<u32>) -> Self
    where
        I: IntoIterator<Item = &'a StatsSummary>,
    {
        let mut years = Vec::new();
        let mut metrics: BTreeMap<String, Vec<Option<f64>>> = CanonicalColumn::SCORES
            .iter()
            .map(|c| (c.name().to_string(), Vec::new()))
            .collect();

        for summary in summaries {
            years.push(summary.year);
            for (metric, series) in metrics.iter_mut() {
                let mean = summary.mean(metric);
                series.push(match digits {
                    Some(d) => mean.map(|v| round_to(v, d)),
                    None => mean,
                });
            }
        }
        Self { years, metrics }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearOverview {
    pub year: i32,
    pub state: YearState,
    pub total_rows: usize,
    /// Canonical columns with at least one populated cell.
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub years: Vec<YearOverview>,
    pub total_rows: usize,
}

impl Overview {
    pub fn new(years: Vec<YearOverview>) -> Self {
        let total_rows = years.iter().map(|y| y.total_rows).sum();
        Self { years, total_rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(count: usize, means: &[(&str, Option<f64>)]) -> GroupStats {
        GroupStats {
            count,
            metric_means: means.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn summary(year: i32, means: &[(&str, Option<f64>)]) -> StatsSummary {
        StatsSummary {
            year,
            total_rows: 0,
            metric_means: means.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            by_category: BTreeMap::new(),
            by_school_type: BTreeMap::new(),
            by_income_bracket: BTreeMap::new(),
            presence_rate: BTreeMap::new(),
        }
    }

    #[test]
    fn test_ranking_excludes_absent_means_from_denominator() {
        let mut groups = BTreeMap::new();
        // (600 + 400) / 2 = 500, the null metric does not drag it down
        groups.insert(
            "A".to_string(),
            group(
                1,
                &[
                    ("Score_Math", Some(600.0)),
                    ("Score_Essay", Some(400.0)),
                    ("Score_Nature", None),
                ],
            ),
        );
        groups.insert("B".to_string(), group(1, &[("Score_Math", Some(550.0))]));
        groups.insert("C".to_string(), group(3, &[("Score_Math", None)]));

        let ranked = rank_groups(&groups);
        let keys: Vec<&str> = ranked.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
        assert_eq!(ranked[1].overall_score, 500.0);
        assert_eq!(ranked[2].overall_score, 0.0);
    }

    #[test]
    fn test_top_categories_truncates_and_breaks_ties_by_key() {
        let mut s = summary(2023, &[]);
        for key in ["RJ", "MG", "SP"] {
            s.by_category
                .insert(key.to_string(), group(1, &[("Score_Math", Some(500.0))]));
        }
        let top = top_categories(&s, 2);
        let keys: Vec<&str> = top.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["MG", "RJ"]);
    }

    #[test]
    fn test_school_types_known_first() {
        let mut s = summary(2023, &[]);
        for code in ["0", "3", "2"] {
            s.by_school_type.insert(code.to_string(), group(1, &[]));
        }
        let entries = school_types(&s);
        let codes: Vec<&str> = entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["2", "3", "0"]);
        assert_eq!(entries[0].label, Some("public"));
        assert_eq!(entries[2].label, None);
    }

    #[test]
    fn test_weakest_metrics() {
        let s = summary(
            2024,
            &[
                ("Score_Math", Some(530.0)),
                ("Score_Essay", Some(610.0)),
                ("Score_Nature", Some(495.5)),
                ("Score_Languages", None),
            ],
        );
        let weakest = weakest_metrics(&s, 2);
        assert_eq!(weakest.len(), 2);
        assert_eq!(weakest[0].metric, "Score_Nature");
        assert_eq!(weakest[1].metric, "Score_Math");
    }

    #[test]
    fn test_metric_series_keeps_gaps() {
        let a = summary(2022, &[("Score_Math", Some(512.3456))]);
        let b = summary(2023, &[("Score_Math", None)]);

        let series = MetricSeries::build([&a, &b], Some(2));
        assert_eq!(series.years, vec![2022, 2023]);
        assert_eq!(series.metrics["Score_Math"], vec![Some(512.35), None]);
        assert_eq!(series.metrics["Score_Essay"], vec![None, None]);
    }

    #[test]
    fn test_overview_totals() {
        let overview = Overview::new(vec![
            YearOverview {
                year: 2022,
                state: YearState::Summarized,
                total_rows: 10,
                columns: 4,
            },
            YearOverview {
                year: 2023,
                state: YearState::Unloaded,
                total_rows: 0,
                columns: 0,
            },
        ]);
        assert_eq!(overview.total_rows, 10);
    }
}
