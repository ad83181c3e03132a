use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::CellAddress;

/// Grey fills the template uses for user-editable cells (ARGB)
pub const INPUT_FILLS: [&str; 4] = ["FFD9D9D9", "FFBFBFBF", "FFE7E6E6", "FFDDDDDD"];

/// Blue fills the template uses for calculated cells (ARGB)
pub const DERIVED_FILLS: [&str; 4] = ["FFBDD7EE", "FF9DC3E6", "FFB4C6E7", "FFB7DEE8"];

const WHITE: &str = "FFFFFFFF";

/// Role of one cell within a working block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellClass {
    /// Editable by the user, never written by recalculation
    Input,
    /// Computed by recalculation, never edited directly
    Derived,
    /// Headers, labels and anything else static
    #[default]
    Label,
}

impl CellClass {
    /// Build from the `(is_input, is_derived)` pair a styling reader reports.
    /// Input wins if both are set.
    pub fn from_flags(is_input: bool, is_derived: bool) -> Self {
        match (is_input, is_derived) {
            (true, _) => CellClass::Input,
            (false, true) => CellClass::Derived,
            (false, false) => CellClass::Label,
        }
    }

    /// Classify by the cell's solid fill colour (ARGB hex, `#` optional).
    ///
    /// Known greys are inputs, known blues are derived; any other non-white
    /// fill is treated as an input, and no fill or white is a label.
    pub fn from_fill(argb: Option<&str>) -> Self {
        let Some(argb) = argb else {
            return CellClass::Label;
        };
        let argb = argb.trim().trim_start_matches('#').to_ascii_uppercase();
        // RGB without alpha is opaque
        let argb = if argb.len() == 6 { format!("FF{argb}") } else { argb };

        if argb.is_empty() || argb == WHITE {
            CellClass::Label
        } else if DERIVED_FILLS.contains(&argb.as_str()) {
            CellClass::Derived
        } else {
            CellClass::Input
        }
    }

    pub fn is_input(self) -> bool {
        self == CellClass::Input
    }

    pub fn is_derived(self) -> bool {
        self == CellClass::Derived
    }
}

/// Per-address classification, computed once from the template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classification {
    classes: HashMap<CellAddress, CellClass>,
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, addr: CellAddress, class: CellClass) {
        self.classes.insert(addr, class);
    }

    /// Class of an address; unclassified cells are labels
    pub fn class_of(&self, addr: CellAddress) -> CellClass {
        self.classes.get(&addr).copied().unwrap_or_default()
    }

    pub fn is_input(&self, addr: CellAddress) -> bool {
        self.class_of(addr).is_input()
    }

    pub fn is_derived(&self, addr: CellAddress) -> bool {
        self.class_of(addr).is_derived()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<(CellAddress, CellClass)> for Classification {
    fn from_iter<I: IntoIterator<Item = (CellAddress, CellClass)>>(iter: I) -> Self {
        Classification {
            classes: iter.into_iter().collect(),
        }
    }
}
