use calcsheet_core::{CellRange, CellValue};

use super::math::scalar_number;
use crate::error::{EvalError, EvalResult};
use crate::resolver::Resolver;

/// VLOOKUP - Exact-match lookup down the first column of `table`.
///
/// The `exact` flag of the spreadsheet signature is accepted by the caller
/// and ignored; sorted/approximate lookup is not supported. A miss is a
/// `NotFound` failure so that `IFERROR` can catch it.
pub fn vlookup(
    resolver: &Resolver<'_>,
    lookup_value: &CellValue,
    table: &CellRange,
    column: &CellValue,
) -> EvalResult<CellValue> {
    let index = column_index(column)?;

    resolver
        .resolve_table_range(table, lookup_value, index)?
        .ok_or_else(|| EvalError::NotFound(lookup_value.as_text()))
}

/// Parse a 1-based column index argument
pub fn column_index(column: &CellValue) -> EvalResult<u32> {
    let n = scalar_number(column)?.trunc();
    if n < 1.0 {
        return Err(EvalError::Value(format!(
            "VLOOKUP column index must be at least 1, got {}",
            column.as_text()
        )));
    }
    Ok(n as u32)
}
