//! Locale-tolerant numeric coercion.
//!
//! Template inputs come from people who type `1 500,5` as often as `1500.5`,
//! so textual values drop spaces (ordinary and non-breaking, used as
//! thousands separators) and read a decimal comma as a decimal point.

use crate::value::CellValue;

const IGNORED_SEPARATORS: [char; 3] = [' ', '\u{00A0}', '\u{202F}'];

/// Convert a cell value to a number, or `None` when it has no numeric reading.
///
/// Total: never panics, whatever the input.
pub fn to_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Empty => None,
        CellValue::Number(n) => Some(*n),
        CellValue::Boolean(_) => None,
        CellValue::Text(s) => parse_number_text(s),
    }
}

/// Parse free-form numeric text (`" 3 "`, `"4,5"`, `"12\u{00A0}000"`)
pub fn parse_number_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !IGNORED_SEPARATORS.contains(c))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    // `f64::from_str` accepts "inf" and "NaN"; neither is a number a user typed
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty() {
        assert_eq!(to_number(&CellValue::Empty), None);
        assert_eq!(to_number(&CellValue::text("")), None);
        assert_eq!(to_number(&CellValue::text("   ")), None);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(to_number(&CellValue::Number(7.25)), Some(7.25));
        assert_eq!(to_number(&CellValue::Number(-3.0)), Some(-3.0));
    }

    #[test]
    fn test_locale_text() {
        assert_eq!(to_number(&CellValue::text("3")), Some(3.0));
        assert_eq!(to_number(&CellValue::text("4,5")), Some(4.5));
        assert_eq!(to_number(&CellValue::text(" 1 200 ")), Some(1200.0));
        assert_eq!(to_number(&CellValue::text("12\u{00A0}000,75")), Some(12000.75));
        assert_eq!(to_number(&CellValue::text("-0,5")), Some(-0.5));
    }

    #[test]
    fn test_malformed_text_is_absent() {
        for text in ["x", "1,2,3", "12abc", "inf", "NaN", "--1", "\u{0}"] {
            assert_eq!(to_number(&CellValue::text(text)), None, "{text:?}");
        }
        assert_eq!(to_number(&CellValue::Boolean(true)), None);
    }
}
