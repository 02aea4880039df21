use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{TableStore, YearKey, YearState};
use crate::error::{Error, Result};
use crate::stats::report::{MetricSeries, Overview, YearOverview};
use crate::stats::{aggregate, StatsSummary};

/// Write-once cache of yearly summaries layered over a [`TableStore`].
pub struct StatsCache {
    tables: Arc<TableStore>,
    slots: BTreeMap<YearKey, OnceCell<Arc<StatsSummary>>>,
}

impl StatsCache {
    pub fn new(tables: Arc<TableStore>) -> Self {
        let slots = tables.years().into_iter().map(|y| (y, OnceCell::new())).collect();
        Self { tables, slots }
    }

    pub fn tables(&self) -> &Arc<TableStore> {
        &self.tables
    }

    pub fn years(&self) -> Vec<YearKey> {
        self.tables.years()
    }

    /// Summary for `year`, computing it (and loading the table if needed) on
    /// first access. Fails only for an unconfigured year.
    pub fn get(&self, year: YearKey) -> Result<Arc<StatsSummary>> {
        let slot = self
            .slots
            .get(&year)
            .ok_or_else(|| self.tables.invalid_year(year))?;
        let summary = slot.get_or_try_init(|| {
            let table = self.tables.get(year)?;
            let summary = aggregate(&table);
            debug!(year, rows = summary.total_rows, "summary cached");
            Ok::<_, Error>(Arc::new(summary))
        })?;
        Ok(Arc::clone(summary))
    }

    pub fn state(&self, year: YearKey) -> Result<YearState> {
        let slot = self
            .slots
            .get(&year)
            .ok_or_else(|| self.tables.invalid_year(year))?;
        Ok(if slot.get().is_some() {
            YearState::Summarized
        } else if self.tables.is_loaded(year) {
            YearState::Loaded
        } else {
            YearState::Unloaded
        })
    }

    /// Populate every configured year in parallel. Returns how many years
    /// ended up with at least one row.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn warm(&self) -> usize {
        let years = self.years();
        let with_rows = years
            .par_iter()
            .filter_map(|&year| self.get(year).ok())
            .filter(|s| s.total_rows > 0)
            .count();
        info!(years = years.len(), with_rows, "warmup finished");
        with_rows
    }

    /// Per-year state and sizes. Never triggers a load.
    pub fn overview(&self) -> Overview {
        let years = self
            .slots
            .keys()
            .map(|&year| {
                let table = self.tables.peek(year);
                YearOverview {
                    year,
                    state: self.state(year).unwrap_or(YearState::Unloaded),
                    total_rows: table.as_ref().map_or(0, |t| t.num_rows()),
                    columns: table.as_ref().map_or(0, |t| {
                        t.columns().iter().filter(|c| t.populated(**c) > 0).count()
                    }),
                }
            })
            .collect();
        Overview::new(years)
    }

    /// Score means across every configured year that has data, ascending by
    /// year. Populates years on demand.
    pub fn series(&self, digits: Option<u32>) -> MetricSeries {
        let summaries: Vec<Arc<StatsSummary>> = self
            .years()
            .into_iter()
            .filter_map(|year| self.get(year).ok())
            .filter(|s| s.total_rows > 0)
            .collect();
        MetricSeries::build(summaries.iter().map(|s| s.as_ref()), digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{raw, Canned, CountingSource};
    use crate::store::RawSource;

    fn cache(canned: Canned) -> (Arc<CountingSource>, StatsCache) {
        let source = Arc::new(CountingSource::new(canned));
        let tables = TableStore::new([2022, 2023], source.clone() as Arc<dyn RawSource>);
        (source, StatsCache::new(Arc::new(tables)))
    }

    fn sample() -> Canned {
        Canned::Table(raw(
            &["NU_NOTA_MT", "SG_UF_RESIDENCIA", "TP_PRESENCA_MT"],
            &[&["100", "X", "1"], &["", "X", "0"], &["80", "Y", "1"]],
        ))
    }

    #[test]
    fn test_summary_cached_after_first_call() {
        let (source, cache) = cache(sample());
        let a = cache.get(2023).unwrap();
        let b = cache.get(2023).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.mean("Score_Math"), Some(90.0));
        assert_eq!(a.by_category["X"].count, 2);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_state_moves_forward() {
        let (_, cache) = cache(sample());
        assert_eq!(cache.state(2022).unwrap(), YearState::Unloaded);
        cache.tables().get(2022).unwrap();
        assert_eq!(cache.state(2022).unwrap(), YearState::Loaded);
        cache.get(2022).unwrap();
        assert_eq!(cache.state(2022).unwrap(), YearState::Summarized);
        assert!(matches!(
            cache.state(2030),
            Err(Error::InvalidYear { year: 2030, .. })
        ));
    }

    #[test]
    fn test_invalid_year() {
        let (source, cache) = cache(sample());
        let err = cache.get(1999).unwrap_err();
        assert!(err.is_client_fault());
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_missing_year_summary() {
        let (_, cache) = cache(Canned::Missing);
        let summary = cache.get(2022).unwrap();
        assert_eq!(summary.total_rows, 0);
        assert!(summary.metric_means.values().all(Option::is_none));
        assert!(cache.series(Some(2)).years.is_empty());
    }

    #[test]
    fn test_overview_does_not_load() {
        let (source, cache) = cache(sample());
        let before = cache.overview();
        assert_eq!(before.total_rows, 0);
        assert!(before.years.iter().all(|y| y.state == YearState::Unloaded));
        assert_eq!(source.calls(), 0);

        cache.get(2023).unwrap();
        let after = cache.overview();
        assert_eq!(after.total_rows, 3);
        assert_eq!(after.years[1].state, YearState::Summarized);
        assert_eq!(after.years[1].columns, 3);
    }

    #[test]
    fn test_warm_and_series() {
        let (source, cache) = cache(sample());
        assert_eq!(cache.warm(), 2);
        assert_eq!(source.calls(), 2);

        let series = cache.series(None);
        assert_eq!(series.years, vec![2022, 2023]);
        assert_eq!(series.metrics["Score_Math"], vec![Some(90.0), Some(90.0)]);
        assert_eq!(source.calls(), 2);
    }
}
