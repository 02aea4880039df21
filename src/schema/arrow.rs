// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::{CanonicalColumn, ColumnKind};

/// Arrow type a column of this kind is stored as.
///
/// - Score, Presence     → Float64
/// - Identifier, Category → Utf8
pub fn map_to_arrow_type(kind: ColumnKind) -> DataType {
    if kind.is_numeric() {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// Build an ArrowSchema (inside an Arc) for the given canonical columns, named
/// by [`CanonicalColumn::name`].
pub fn build_arrow_schema(cols: &[CanonicalColumn]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = cols
        .iter()
        .map(|col| ArrowField::new(col.name(), map_to_arrow_type(col.kind()), true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
