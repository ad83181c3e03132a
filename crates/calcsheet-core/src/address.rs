use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{CoreError, CoreResult};

/// Largest column label is `ZZZ`
pub const MAX_COL: u32 = 18_277;

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{1,3})([0-9]+)$").expect("valid address regex"))
}

fn revision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("valid revision regex"))
}

/// Cell address (0-indexed internally, rendered in A1 notation)
///
/// Field order makes the derived `Ord` row-major, which is also the order
/// ranges expand in.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub const fn new(row: u32, col: u32) -> Self {
        CellAddress { row, col }
    }

    /// Parse A1 notation, ignoring `$` absolute markers (`$B$2` -> B2)
    pub fn parse(text: &str) -> CoreResult<Self> {
        let stripped: String = text.trim().chars().filter(|c| *c != '$').collect();
        let caps = address_re()
            .captures(&stripped)
            .ok_or_else(|| CoreError::MalformedAddress(text.to_string()))?;

        let col = col_from_label(&caps[1]).ok_or_else(|| CoreError::MalformedAddress(text.to_string()))?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| CoreError::MalformedAddress(text.to_string()))?;

        if row == 0 {
            return Err(CoreError::MalformedAddress(text.to_string()));
        }

        Ok(CellAddress { row: row - 1, col })
    }

    /// Canonical A1 form, never carrying `$` markers
    pub fn to_a1(&self) -> String {
        format!("{}{}", col_to_label(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellAddress::parse(s)
    }
}

// Addresses travel as "A1" strings so they can key JSON objects.
impl Serialize for CellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_a1())
    }
}

impl<'de> Deserialize<'de> for CellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CellAddress::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Convert column index (0-indexed) to label (A, B, ..., Z, AA, AB, ...)
pub fn col_to_label(col: u32) -> String {
    let mut label = String::new();
    let mut n = col + 1;

    while n > 0 {
        n -= 1;
        label.insert(0, char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }

    label
}

/// Convert a 1-3 letter column label to its index (0-indexed)
pub fn col_from_label(label: &str) -> Option<u32> {
    if label.is_empty() || label.len() > 3 {
        return None;
    }

    let mut col: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (c as u32 - 'A' as u32 + 1);
    }

    Some(col - 1)
}

/// Remove workbook-revision markers such as `[1]` from a sheet name
pub fn strip_revision_markers(text: &str) -> String {
    revision_re().replace_all(text, "").into_owned()
}

/// Expand the rectangle spanned by two corners in row-major order.
///
/// Corners may be given in any order.
pub fn expand_range(a: CellAddress, b: CellAddress) -> Vec<CellAddress> {
    CellRange::new(a, b).iter().collect()
}

/// A rectangular range of cells (e.g. `A1:B10`), optionally sheet-qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub sheet: Option<String>,
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        // Normalize so start is top-left and end is bottom-right
        CellRange {
            sheet: None,
            start: CellAddress::new(start.row.min(end.row), start.col.min(end.col)),
            end: CellAddress::new(start.row.max(end.row), start.col.max(end.col)),
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Parse `A1:B2`, `Sheet!A1:B2`, `'[1]My sheet'!$A$1:$C$9` or a single address.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let text = text.trim();
        let (sheet, reference) = match text.rsplit_once('!') {
            Some((sheet, reference)) => (Some(normalize_sheet_name(sheet)?), reference),
            None => (None, text),
        };

        let parts: Vec<&str> = reference.split(':').collect();
        let range = match parts.as_slice() {
            [single] => {
                let addr = CellAddress::parse(single)?;
                CellRange::new(addr, addr)
            }
            [start, end] => CellRange::new(CellAddress::parse(start)?, CellAddress::parse(end)?),
            _ => return Err(CoreError::MalformedRange(text.to_string())),
        };

        Ok(CellRange { sheet, ..range })
    }

    /// Convert to A1:B1 notation (without the sheet qualifier)
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }

    /// Check if an address is within this range
    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Iterate over all addresses in the range (row by row)
    pub fn iter(&self) -> CellRangeIter {
        CellRangeIter {
            start: self.start,
            end: self.end,
            current_row: self.start.row,
            current_col: self.start.col,
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) if sheet.contains([' ', '!', '\'']) => {
                write!(f, "'{}'!{}", sheet.replace('\'', "''"), self.to_a1())
            }
            Some(sheet) => write!(f, "{}!{}", sheet, self.to_a1()),
            None => write!(f, "{}", self.to_a1()),
        }
    }
}

impl FromStr for CellRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRange::parse(s)
    }
}

impl Serialize for CellRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CellRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CellRange::parse(&text).map_err(serde::de::Error::custom)
    }
}

impl IntoIterator for &CellRange {
    type Item = CellAddress;
    type IntoIter = CellRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn normalize_sheet_name(raw: &str) -> CoreResult<String> {
    let raw = strip_revision_markers(raw.trim());
    let unquoted = match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.clone(),
    };
    let name = strip_revision_markers(&unquoted).trim().to_string();

    if name.is_empty() {
        return Err(CoreError::MalformedRange(raw));
    }
    Ok(name)
}

/// Iterator over addresses in a range
pub struct CellRangeIter {
    start: CellAddress,
    end: CellAddress,
    current_row: u32,
    current_col: u32,
}

impl Iterator for CellRangeIter {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row > self.end.row {
            return None;
        }

        let addr = CellAddress::new(self.current_row, self.current_col);

        self.current_col += 1;
        if self.current_col > self.end.col {
            self.current_col = self.start.col;
            self.current_row += 1;
        }

        Some(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn addr(text: &str) -> CellAddress {
        CellAddress::parse(text).unwrap()
    }

    #[test]
    fn test_col_to_label() {
        assert_eq!(col_to_label(0), "A");
        assert_eq!(col_to_label(25), "Z");
        assert_eq!(col_to_label(26), "AA");
        assert_eq!(col_to_label(701), "ZZ");
        assert_eq!(col_to_label(702), "AAA");
        assert_eq!(col_to_label(MAX_COL), "ZZZ");
    }

    #[test]
    fn test_col_from_label() {
        assert_eq!(col_from_label("A"), Some(0));
        assert_eq!(col_from_label("AB"), Some(27));
        assert_eq!(col_from_label("ZZZ"), Some(MAX_COL));
        assert_eq!(col_from_label("AAAA"), None);
        assert_eq!(col_from_label("a"), None);
        assert_eq!(col_from_label(""), None);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(addr("A1"), CellAddress::new(0, 0));
        assert_eq!(addr("AA100"), CellAddress::new(99, 26));
        assert_eq!(addr("$C$27"), CellAddress::new(26, 2));
        assert_eq!(addr("$C$27").to_a1(), "C27");
        assert_eq!(addr("E$21"), addr("E21"));
    }

    #[test]
    fn test_parse_address_rejects_malformed() {
        for text in ["", "12A", "A0", "ABCD1", "A1B", "Sheet!A1", "a1"] {
            assert_eq!(
                CellAddress::parse(text),
                Err(CoreError::MalformedAddress(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_expand_range_row_major() {
        let cells: Vec<String> = expand_range(addr("A1"), addr("B2")).iter().map(|a| a.to_a1()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_expand_range_is_symmetric() {
        let pairs = [("A1", "C3"), ("B7", "B2"), ("D4", "A4"), ("C1", "A5")];
        for (a, b) in pairs {
            let forward = expand_range(addr(a), addr(b));
            let backward = expand_range(addr(b), addr(a));
            let forward_set: HashSet<_> = forward.iter().copied().collect();
            let backward_set: HashSet<_> = backward.iter().copied().collect();
            assert_eq!(forward_set, backward_set);
            assert_eq!(forward.len(), backward.len());
        }
    }

    #[test]
    fn test_parse_range_with_sheet() {
        let range = CellRange::parse("'[1]City reach'!$A$2:$C$5").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("City reach"));
        assert_eq!(range.to_a1(), "A2:C5");

        let range = CellRange::parse("[2]Lists!B1:B9").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Lists"));

        let range = CellRange::parse("'O''Brien'!A1").unwrap();
        assert_eq!(range.sheet.as_deref(), Some("O'Brien"));
        assert_eq!((range.row_count(), range.col_count()), (1, 1));
    }

    #[test]
    fn test_parse_range_rejects_malformed() {
        assert!(matches!(CellRange::parse("A1:B2:C3"), Err(CoreError::MalformedRange(_))));
        assert!(matches!(CellRange::parse("''!A1"), Err(CoreError::MalformedRange(_))));
        assert!(matches!(CellRange::parse("A1:"), Err(CoreError::MalformedAddress(_))));
    }

    #[test]
    fn test_range_contains() {
        let range = CellRange::parse("C27:O134").unwrap();
        assert!(range.contains(addr("C27")));
        assert!(range.contains(addr("O134")));
        assert!(!range.contains(addr("P27")));
        assert_eq!(range.row_count(), 108);
        assert_eq!(range.col_count(), 13);
    }

    #[test]
    fn test_address_serde_roundtrip_as_string() {
        let json = serde_json::to_string(&addr("E21")).unwrap();
        assert_eq!(json, "\"E21\"");
        let back: CellAddress = serde_json::from_str("\"$E$21\"").unwrap();
        assert_eq!(back, addr("E21"));
    }
}
