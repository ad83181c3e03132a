use std::collections::BTreeMap;

use crate::address::strip_revision_markers;
use crate::store::ValueStore;

/// Read-only reference sheets (lookup tables, option lists) shared by every
/// scenario built from the same template.
///
/// Sheet names are stored without workbook-revision markers, so `[1]Cities`
/// and `Cities` name the same sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: BTreeMap<String, ValueStore>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sheet
    pub fn insert_sheet(&mut self, name: &str, values: ValueStore) -> Option<ValueStore> {
        self.sheets.insert(normalize(name), values)
    }

    /// Get a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&ValueStore> {
        self.sheets.get(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

fn normalize(name: &str) -> String {
    strip_revision_markers(name).trim().to_string()
}
