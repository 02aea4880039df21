use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    record_batch::RecordBatch,
};
use std::collections::BTreeMap;
use tracing::debug;

use super::arrow::build_arrow_schema;
use super::types::CanonicalColumn;
use crate::error::{Error, Result};
use crate::process::{convert::convert_column, utils::clean_str, RawTable};

/// A year's rows narrowed to the canonical columns present in its source,
/// each typed per its [`ColumnKind`](super::ColumnKind).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTable {
    year: i32,
    columns: Vec<CanonicalColumn>,
    batch: RecordBatch,
}

impl ProjectedTable {
    /// Zero rows, every canonical column declared.
    pub fn empty(year: i32) -> Self {
        let columns = CanonicalColumn::ALL.to_vec();
        let batch = RecordBatch::new_empty(build_arrow_schema(&columns));
        Self {
            year,
            columns,
            batch,
        }
    }

    /// Assemble a table from already-typed arrays. Columns are stored in
    /// canonical order regardless of input order.
    pub fn from_arrays(year: i32, arrays: Vec<(CanonicalColumn, ArrayRef)>) -> Result<Self> {
        let sorted: BTreeMap<CanonicalColumn, ArrayRef> = arrays.into_iter().collect();
        let columns: Vec<CanonicalColumn> = sorted.keys().copied().collect();
        let schema = build_arrow_schema(&columns);
        let batch = RecordBatch::try_new(schema, sorted.into_values().collect())?;
        Ok(Self {
            year,
            columns,
            batch,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Canonical columns carried by this table, in canonical order.
    pub fn columns(&self) -> &[CanonicalColumn] {
        &self.columns
    }

    pub fn has(&self, col: CanonicalColumn) -> bool {
        self.columns.contains(&col)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Float view of a score or presence column, if present.
    pub fn numeric(&self, col: CanonicalColumn) -> Option<&Float64Array> {
        self.batch
            .column_by_name(col.name())
            .and_then(|a| a.as_any().downcast_ref::<Float64Array>())
    }

    /// Text view of an identifier or category column, if present.
    pub fn text(&self, col: CanonicalColumn) -> Option<&StringArray> {
        self.batch
            .column_by_name(col.name())
            .and_then(|a| a.as_any().downcast_ref::<StringArray>())
    }

    /// Number of non-null cells in `col`; zero if the column is absent.
    pub fn populated(&self, col: CanonicalColumn) -> usize {
        self.batch
            .column_by_name(col.name())
            .map(|a| a.len() - a.null_count())
            .unwrap_or(0)
    }
}

/// Narrow `raw` to the canonical columns its header names.
///
/// Headers are cleaned of padding and invisible characters, then matched
/// exactly against the alias table. When a header repeats, the first wins.
/// Fails with [`Error::NoRecognizedColumns`] when nothing matches.
pub fn project(raw: &RawTable, year: i32) -> Result<ProjectedTable> {
    let mut matched: BTreeMap<CanonicalColumn, usize> = BTreeMap::new();
    for (idx, header) in raw.headers.iter().enumerate() {
        let Some(col) = CanonicalColumn::from_alias(clean_str(header)) else {
            continue;
        };
        if matched.contains_key(&col) {
            debug!(column = col.name(), idx, "duplicate header ignored");
            continue;
        }
        matched.insert(col, idx);
    }

    if matched.is_empty() {
        return Err(Error::NoRecognizedColumns {
            year,
            header_count: raw.headers.len(),
        });
    }
    debug!(
        year,
        recognized = matched.len(),
        headers = raw.headers.len(),
        "projected"
    );

    let arrays = matched
        .into_iter()
        .map(|(col, idx)| (col, convert_column(&raw.rows, idx, col.kind())))
        .collect();
    ProjectedTable::from_arrays(year, arrays)
}
