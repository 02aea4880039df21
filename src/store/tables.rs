use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{RawSource, YearKey};
use crate::error::{Error, Result};
use crate::schema::{project, ProjectedTable};

/// Write-once cache of projected tables, one slot per configured year.
///
/// The set of years is fixed at construction. Each slot is populated at most
/// once per process; concurrent first requests for the same year block on the
/// one load in flight and then share its result.
pub struct TableStore {
    source: Arc<dyn RawSource>,
    slots: BTreeMap<YearKey, OnceCell<Arc<ProjectedTable>>>,
}

impl TableStore {
    pub fn new<I>(years: I, source: Arc<dyn RawSource>) -> Self
    where
        I: IntoIterator<Item = YearKey>,
    {
        let slots = years.into_iter().map(|y| (y, OnceCell::new())).collect();
        Self { source, slots }
    }

    /// Configured years, ascending.
    pub fn years(&self) -> Vec<YearKey> {
        self.slots.keys().copied().collect()
    }

    pub fn contains(&self, year: YearKey) -> bool {
        self.slots.contains_key(&year)
    }

    pub(crate) fn invalid_year(&self, year: YearKey) -> Error {
        Error::InvalidYear {
            year,
            allowed: self.years(),
        }
    }

    fn slot(&self, year: YearKey) -> Result<&OnceCell<Arc<ProjectedTable>>> {
        self.slots.get(&year).ok_or_else(|| self.invalid_year(year))
    }

    /// Projected table for `year`, loading it on first access.
    ///
    /// Only an unconfigured year is an error. Missing, unreadable or
    /// unrecognizable sources are logged and cached as an empty table.
    pub fn get(&self, year: YearKey) -> Result<Arc<ProjectedTable>> {
        let slot = self.slot(year)?;
        let table = slot.get_or_init(|| Arc::new(self.load(year)));
        Ok(Arc::clone(table))
    }

    /// The cached table, without triggering a load.
    pub fn peek(&self, year: YearKey) -> Option<Arc<ProjectedTable>> {
        self.slots.get(&year)?.get().cloned()
    }

    pub fn is_loaded(&self, year: YearKey) -> bool {
        self.peek(year).is_some()
    }

    #[tracing::instrument(level = "info", skip(self))]
    fn load(&self, year: YearKey) -> ProjectedTable {
        let raw = match self.source.fetch(year) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("no source data, caching empty table");
                return ProjectedTable::empty(year);
            }
            Err(e) => {
                error!(error = %e, "source unreadable, caching empty table");
                return ProjectedTable::empty(year);
            }
        };

        match project(&raw, year) {
            Ok(table) => {
                info!(
                    rows = table.num_rows(),
                    columns = table.columns().len(),
                    skipped = raw.skipped_rows,
                    "table loaded"
                );
                table
            }
            Err(e @ Error::NoRecognizedColumns { .. }) => {
                warn!(error = %e, "caching empty table");
                ProjectedTable::empty(year)
            }
            Err(e) => {
                error!(error = %e, "projection failed, caching empty table");
                ProjectedTable::empty(year)
            }
        }
    }
}
