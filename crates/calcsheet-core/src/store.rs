use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::{CellAddress, CellRange};
use crate::value::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// Address -> scalar map holding the working state of one scenario.
///
/// Unset addresses read as [`CellValue::Empty`]; writing `Empty` removes the
/// entry so that "unset" and "empty" are indistinguishable to readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueStore {
    cells: HashMap<CellAddress, CellValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a cell, defaulting to empty
    pub fn get(&self, addr: CellAddress) -> &CellValue {
        self.cells.get(&addr).unwrap_or(&EMPTY)
    }

    /// Write a cell and return the previous value
    pub fn set(&mut self, addr: CellAddress, value: impl Into<CellValue>) -> CellValue {
        let value = value.into();
        let previous = if value.is_empty() {
            self.cells.remove(&addr)
        } else {
            self.cells.insert(addr, value)
        };
        previous.unwrap_or_default()
    }

    /// Values of a range in row-major order
    pub fn range_values(&self, range: &CellRange) -> Vec<CellValue> {
        range.iter().map(|addr| self.get(addr).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over non-empty cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        let mut addrs: Vec<&CellAddress> = self.cells.keys().collect();
        addrs.sort();
        addrs.into_iter().map(move |addr| (*addr, &self.cells[addr]))
    }
}

impl<V: Into<CellValue>> FromIterator<(CellAddress, V)> for ValueStore {
    fn from_iter<I: IntoIterator<Item = (CellAddress, V)>>(iter: I) -> Self {
        let mut store = ValueStore::new();
        for (addr, value) in iter {
            store.set(addr, value);
        }
        store
    }
}
