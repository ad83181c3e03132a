use calcsheet_core::CellValue;

use super::{flatten, Arg};

/// AND - TRUE when every non-empty argument is truthy
pub fn and(args: &[Arg]) -> CellValue {
    CellValue::Boolean(flatten(args).filter(|v| !v.is_empty()).all(CellValue::is_truthy))
}

/// OR - TRUE when any argument is truthy
pub fn or(args: &[Arg]) -> CellValue {
    CellValue::Boolean(flatten(args).any(CellValue::is_truthy))
}

/// NOT - Logical negation
pub fn not(value: &CellValue) -> CellValue {
    CellValue::Boolean(!value.is_truthy())
}

/// COUNTIF - Count elements whose string form equals the criterion's.
///
/// Exact match only: no wildcards, no `">5"` style criteria.
pub fn countif(values: &Arg, criterion: &CellValue) -> CellValue {
    let target = criterion.as_text();
    let count = values
        .values()
        .iter()
        .filter(|v| v.as_text() == target)
        .count();

    CellValue::Number(count as f64)
}
