use calcsheet_core::{to_number, CellValue};

use super::{flatten, Arg};
use crate::error::{EvalError, EvalResult};

/// Numeric elements of all arguments; non-numeric and empty ones are skipped
fn numbers(args: &[Arg]) -> impl Iterator<Item = f64> + '_ {
    flatten(args).filter_map(to_number)
}

/// Wrap an aggregate, failing on overflow or NaN
fn finite(function: &str, n: f64) -> EvalResult<CellValue> {
    if n.is_finite() {
        Ok(CellValue::Number(n))
    } else {
        Err(EvalError::Value(format!("{function} result is not a finite number")))
    }
}

/// SUM - Sum all numeric values, 0 when there are none
pub fn sum(args: &[Arg]) -> EvalResult<CellValue> {
    finite("SUM", numbers(args).sum())
}

/// MAX - Maximum numeric value, 0 when there are none
pub fn max(args: &[Arg]) -> EvalResult<CellValue> {
    let result = numbers(args).fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))));
    finite("MAX", result.unwrap_or(0.0))
}

/// MIN - Minimum numeric value, 0 when there are none
pub fn min(args: &[Arg]) -> EvalResult<CellValue> {
    let result = numbers(args).fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.min(n))));
    finite("MIN", result.unwrap_or(0.0))
}

/// AVERAGE - Mean of the numeric values
pub fn average(args: &[Arg]) -> EvalResult<CellValue> {
    let (total, count) = numbers(args).fold((0.0, 0usize), |(t, c), n| (t + n, c + 1));

    if count == 0 {
        Err(EvalError::DivisionByZero)
    } else {
        finite("AVERAGE", total / count as f64)
    }
}

/// ROUND - Round half away from zero to `digits` decimal places
pub fn round(value: &CellValue, digits: &CellValue) -> EvalResult<CellValue> {
    let n = scalar_number(value)?;
    let digits = scalar_number(digits)?.trunc() as i32;

    let factor = 10f64.powi(digits);
    let rounded = (n * factor).round() / factor;
    if rounded.is_finite() {
        Ok(CellValue::Number(rounded))
    } else {
        Ok(CellValue::Number(n))
    }
}

/// SUMPRODUCT - Sum of element-wise products of equally sized lists
pub fn sumproduct(args: &[Arg]) -> EvalResult<CellValue> {
    let len = args.first().map_or(0, |a| a.values().len());
    if args.iter().any(|a| a.values().len() != len) {
        return Err(EvalError::Value(
            "SUMPRODUCT arguments must have the same size".to_string(),
        ));
    }

    let total = (0..len)
        .map(|i| {
            args.iter()
                .map(|a| to_number(&a.values()[i]).unwrap_or(0.0))
                .product::<f64>()
        })
        .sum();

    finite("SUMPRODUCT", total)
}

/// Coerce a scalar argument for arithmetic: empty (or blank text) is 0,
/// booleans are 1/0, anything else must be numeric text or a number.
pub fn scalar_number(value: &CellValue) -> EvalResult<f64> {
    match value {
        CellValue::Empty => Ok(0.0),
        CellValue::Text(s) if s.trim().is_empty() => Ok(0.0),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => to_number(other).ok_or_else(|| {
            EvalError::Value(format!("'{}' is not a number", other.as_text()))
        }),
    }
}
