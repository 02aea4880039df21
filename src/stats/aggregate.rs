use arrow::array::{Array, Float64Array, StringArray};
use std::collections::BTreeMap;
use tracing::debug;

use super::{GroupStats, MetricMeans, StatsSummary};
use crate::schema::{CanonicalColumn, ProjectedTable, PRESENT_CODE};

const METRICS: usize = CanonicalColumn::SCORES.len();

#[derive(Clone, Copy, Debug, Default)]
struct MeanAcc {
    sum: f64,
    n: usize,
}

impl MeanAcc {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

#[derive(Clone, Debug, Default)]
struct GroupAcc {
    count: usize,
    metrics: [MeanAcc; METRICS],
}

impl GroupAcc {
    fn push_row(&mut self, values: &[Option<f64>; METRICS]) {
        self.count += 1;
        for (acc, v) in self.metrics.iter_mut().zip(values) {
            if let Some(v) = v {
                acc.push(*v);
            }
        }
    }

    fn means(&self) -> MetricMeans {
        CanonicalColumn::SCORES
            .iter()
            .zip(&self.metrics)
            .map(|(col, acc)| (col.name().to_string(), acc.mean()))
            .collect()
    }

    fn finish(&self) -> GroupStats {
        GroupStats {
            count: self.count,
            metric_means: self.means(),
        }
    }
}

fn text_at(arr: Option<&StringArray>, i: usize) -> Option<&str> {
    arr.filter(|a| a.is_valid(i))
        .map(|a| a.value(i))
        .filter(|v| !v.is_empty())
}

fn number_at(arr: Option<&Float64Array>, i: usize) -> Option<f64> {
    arr.filter(|a| a.is_valid(i)).map(|a| a.value(i))
}

fn finish_groups(groups: BTreeMap<String, GroupAcc>) -> BTreeMap<String, GroupStats> {
    groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect()
}

/// Compute the yearly summary of `table` in a single pass over its rows.
///
/// Means only ever see non-null cells of rows in their partition; a metric
/// with no contributing cell reports `None`. Rows with a blank partition key
/// are left out of that partition map. Presence rates are taken over every
/// row, so a null flag counts as absent. Total: an empty table yields zero
/// counts and absent means.
pub fn aggregate(table: &ProjectedTable) -> StatsSummary {
    let rows = table.num_rows();
    let scores: Vec<Option<&Float64Array>> = CanonicalColumn::SCORES
        .iter()
        .map(|c| table.numeric(*c))
        .collect();
    let state = table.text(CanonicalColumn::ResidenceStateCode);
    let school = table.text(CanonicalColumn::SchoolTypeCode);
    let income = table.text(CanonicalColumn::IncomeBracket);

    let mut overall = GroupAcc::default();
    let mut by_category: BTreeMap<String, GroupAcc> = BTreeMap::new();
    let mut by_school_type: BTreeMap<String, GroupAcc> = BTreeMap::new();
    let mut by_income_bracket: BTreeMap<String, GroupAcc> = BTreeMap::new();

    for i in 0..rows {
        let mut values = [None; METRICS];
        for (slot, arr) in values.iter_mut().zip(&scores) {
            *slot = number_at(*arr, i);
        }

        overall.push_row(&values);
        if let Some(key) = text_at(state, i) {
            by_category.entry(key.to_owned()).or_default().push_row(&values);
        }
        if let Some(key) = text_at(school, i) {
            by_school_type.entry(key.to_owned()).or_default().push_row(&values);
        }
        if let Some(key) = text_at(income, i) {
            by_income_bracket.entry(key.to_owned()).or_default().push_row(&values);
        }
    }

    let mut presence_rate = BTreeMap::new();
    if rows > 0 {
        for col in CanonicalColumn::PRESENCE {
            let Some(arr) = table.numeric(col) else {
                continue;
            };
            let present = arr.iter().filter(|v| *v == Some(PRESENT_CODE)).count();
            presence_rate.insert(col.name().to_string(), present as f64 * 100.0 / rows as f64);
        }
    }

    debug!(
        year = table.year(),
        rows,
        states = by_category.len(),
        school_types = by_school_type.len(),
        "aggregated"
    );

    StatsSummary {
        year: table.year(),
        total_rows: rows,
        metric_means: overall.means(),
        by_category: finish_groups(by_category),
        by_school_type: finish_groups(by_school_type),
        by_income_bracket: finish_groups(by_income_bracket),
        presence_rate,
    }
}
