use arrow::array::{ArrayRef, Float64Builder, StringBuilder};
use std::sync::Arc;

use crate::process::utils;
use crate::schema::ColumnKind;

/// Build the arrow column for position `idx` of `rows`, typed by `kind`.
///
/// Numeric kinds parse each cell to f64 (unparseable or blank → null); text
/// kinds keep the cleaned cell (blank → null). Never fails.
pub fn convert_column(rows: &[Vec<String>], idx: usize, kind: ColumnKind) -> ArrayRef {
    let cells = rows.iter().map(|r| r.get(idx).map(String::as_str).unwrap_or(""));

    if kind.is_numeric() {
        let mut b = Float64Builder::with_capacity(rows.len());
        for cell in cells {
            b.append_option(utils::parse_number(cell));
        }
        Arc::new(b.finish()) as ArrayRef
    } else {
        let mut b = StringBuilder::with_capacity(rows.len(), rows.len() * 4);
        for cell in cells {
            b.append_option(utils::category_value(cell));
        }
        Arc::new(b.finish()) as ArrayRef
    }
}
