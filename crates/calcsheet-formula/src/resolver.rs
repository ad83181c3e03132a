//! Reference resolution against the live value store and the read-only
//! reference sheets.

use calcsheet_core::{strip_revision_markers, CellAddress, CellRange, CellValue, ValueStore, Workbook};

use crate::error::{EvalError, EvalResult};

/// Resolves cell, range and table references for one evaluation.
///
/// Unqualified references, and references naming the current sheet, read the
/// scenario's [`ValueStore`]; any other sheet is looked up in the reference
/// [`Workbook`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a ValueStore,
    book: Option<&'a Workbook>,
    sheet: Option<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a ValueStore) -> Self {
        Self {
            store,
            book: None,
            sheet: None,
        }
    }

    pub fn with_workbook(mut self, book: &'a Workbook) -> Self {
        self.book = Some(book);
        self
    }

    /// Name of the sheet the value store represents
    pub fn with_sheet(mut self, sheet: &'a str) -> Self {
        self.sheet = Some(sheet);
        self
    }

    fn values_for(&self, sheet: Option<&str>) -> EvalResult<&'a ValueStore> {
        let Some(name) = sheet else {
            return Ok(self.store);
        };

        let name = strip_revision_markers(name);
        let name = name.trim();
        if self.sheet.is_some_and(|current| current.trim() == name) {
            return Ok(self.store);
        }

        self.book
            .and_then(|book| book.sheet(name))
            .ok_or_else(|| EvalError::UnknownSheet(name.to_string()))
    }

    /// Value at `addr`, empty if unset
    pub fn resolve_cell(&self, sheet: Option<&str>, addr: CellAddress) -> EvalResult<CellValue> {
        Ok(self.values_for(sheet)?.get(addr).clone())
    }

    /// Values of every cell of the range, row-major
    pub fn resolve_range(&self, range: &CellRange) -> EvalResult<Vec<CellValue>> {
        Ok(self.values_for(range.sheet.as_deref())?.range_values(range))
    }

    /// Exact-match table lookup from reference text such as
    /// `'[1]City reach'!$A$2:$C$90`.
    pub fn resolve_table(
        &self,
        reference: &str,
        lookup_value: &CellValue,
        column_index: u32,
    ) -> EvalResult<Option<CellValue>> {
        let range = CellRange::parse(reference)?;
        self.resolve_table_range(&range, lookup_value, column_index)
    }

    /// Scan the leftmost column of `range` top to bottom for the first key
    /// whose string form equals the lookup value's, and read the cell
    /// `column_index` columns across (1 is the key column itself).
    ///
    /// Returns `Ok(None)` when no row matches and `Ok(Some(Empty))` when the
    /// column lies outside the range. Empty keys never match.
    pub fn resolve_table_range(
        &self,
        range: &CellRange,
        lookup_value: &CellValue,
        column_index: u32,
    ) -> EvalResult<Option<CellValue>> {
        let values = self.values_for(range.sheet.as_deref())?;

        let key = lookup_value.as_text();
        let key = key.trim();
        if key.is_empty() {
            return Ok(None);
        }

        let key_col = range.start.col;
        let hit = (range.start.row..=range.end.row)
            .map(|row| CellAddress::new(row, key_col))
            .find(|addr| values.get(*addr).as_text().trim() == key);

        let Some(hit) = hit else {
            return Ok(None);
        };

        if column_index == 0 || column_index > range.col_count() {
            return Ok(Some(CellValue::Empty));
        }

        let target = CellAddress::new(hit.row, key_col + column_index - 1);
        Ok(Some(values.get(target).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> CellAddress {
        CellAddress::parse(text).unwrap()
    }

    fn cities() -> ValueStore {
        [
            (addr("A2"), CellValue::text("Kazan")),
            (addr("B2"), CellValue::Number(80.0)),
            (addr("A3"), CellValue::text("Moscow")),
            (addr("B3"), CellValue::Number(120.0)),
            (addr("C3"), CellValue::text("capital")),
            (addr("A4"), CellValue::text(" Moscow ")),
            (addr("B4"), CellValue::Number(999.0)),
            (addr("A5"), CellValue::Number(42.0)),
            (addr("B5"), CellValue::text("answer")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_cell_defaults_to_empty() {
        let store = cities();
        let resolver = Resolver::new(&store);
        assert_eq!(resolver.resolve_cell(None, addr("B3")), Ok(CellValue::Number(120.0)));
        assert_eq!(resolver.resolve_cell(None, addr("Z99")), Ok(CellValue::Empty));
    }

    #[test]
    fn test_resolve_range_row_major() {
        let store = cities();
        let resolver = Resolver::new(&store);
        let range = CellRange::parse("A2:B3").unwrap();
        assert_eq!(
            resolver.resolve_range(&range).unwrap(),
            vec![
                CellValue::text("Kazan"),
                CellValue::Number(80.0),
                CellValue::text("Moscow"),
                CellValue::Number(120.0),
            ]
        );
    }

    #[test]
    fn test_table_lookup_first_match_wins() {
        let store = cities();
        let resolver = Resolver::new(&store);
        let moscow = CellValue::text("Moscow");

        assert_eq!(
            resolver.resolve_table("A2:C5", &moscow, 2),
            Ok(Some(CellValue::Number(120.0)))
        );
        assert_eq!(
            resolver.resolve_table("A2:C5", &moscow, 3),
            Ok(Some(CellValue::text("capital")))
        );
        assert_eq!(resolver.resolve_table("A2:C5", &moscow, 1), Ok(Some(moscow.clone())));
    }

    #[test]
    fn test_table_lookup_miss_and_out_of_range_column() {
        let store = cities();
        let resolver = Resolver::new(&store);

        assert_eq!(resolver.resolve_table("A2:C5", &CellValue::text("Unknown"), 2), Ok(None));
        assert_eq!(
            resolver.resolve_table("A2:C5", &CellValue::text("Moscow"), 4),
            Ok(Some(CellValue::Empty))
        );
        assert_eq!(resolver.resolve_table("A2:C5", &CellValue::Empty, 2), Ok(None));
    }

    #[test]
    fn test_table_lookup_compares_string_forms() {
        let store = cities();
        let resolver = Resolver::new(&store);
        assert_eq!(
            resolver.resolve_table("A2:C5", &CellValue::text("42"), 2),
            Ok(Some(CellValue::text("answer")))
        );
        assert_eq!(
            resolver.resolve_table("A2:C5", &CellValue::Number(42.0), 2),
            Ok(Some(CellValue::text("answer")))
        );
    }

    #[test]
    fn test_cross_sheet_table() {
        let store = ValueStore::new();
        let mut book = Workbook::new();
        book.insert_sheet("City reach", cities());
        let resolver = Resolver::new(&store).with_workbook(&book).with_sheet("Calc");

        assert_eq!(
            resolver.resolve_table("'[1]City reach'!$A$2:$C$90", &CellValue::text("Kazan"), 2),
            Ok(Some(CellValue::Number(80.0)))
        );
        assert_eq!(
            resolver.resolve_table("Nowhere!A1:B2", &CellValue::text("Kazan"), 2),
            Err(EvalError::UnknownSheet("Nowhere".to_string()))
        );
        assert!(matches!(
            resolver.resolve_table("A2:", &CellValue::text("Kazan"), 2),
            Err(EvalError::Reference(_))
        ));
    }

    #[test]
    fn test_current_sheet_name_reads_store() {
        let store = cities();
        let book = Workbook::new();
        let resolver = Resolver::new(&store).with_workbook(&book).with_sheet("Calc");
        assert_eq!(
            resolver.resolve_cell(Some("Calc"), addr("B2")),
            Ok(CellValue::Number(80.0))
        );
        assert_eq!(
            resolver.resolve_cell(Some("Lists"), addr("B2")),
            Err(EvalError::UnknownSheet("Lists".to_string()))
        );
    }
}
