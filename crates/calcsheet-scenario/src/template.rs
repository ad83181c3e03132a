//! Templates: the literal cells, formula cells, classification, working
//! blocks and reference sheets every scenario starts from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use calcsheet_core::{
    CellAddress, CellClass, CellValue, Classification, ValueStore, WorkingBlock, Workbook,
};
use calcsheet_formula::FormulaSet;

use crate::error::{ScenarioError, ScenarioResult};

pub const DEFAULT_SHEET: &str = "TEMPLATE";

/// How one cell is classified in a template source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassSource {
    /// `"input"`, `"derived"` or `"label"`
    Class(CellClass),
    /// The pair a styling reader reports
    Flags { is_input: bool, is_derived: bool },
}

impl ClassSource {
    fn class(&self) -> CellClass {
        match self {
            ClassSource::Class(class) => *class,
            ClassSource::Flags {
                is_input,
                is_derived,
            } => CellClass::from_flags(*is_input, *is_derived),
        }
    }
}

/// Serialized form of a template.
///
/// Cell text starting with `=` is a formula; anything else is a literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSource {
    pub name: String,
    pub sheet: Option<String>,
    pub blocks: Vec<WorkingBlock>,
    pub cells: BTreeMap<String, CellValue>,
    /// Explicit classification by address
    pub classification: BTreeMap<String, ClassSource>,
    /// ARGB fill colours by address, used where no explicit class is given
    pub fills: BTreeMap<String, String>,
    /// Reference sheets (lookup tables, option lists)
    pub sheets: BTreeMap<String, BTreeMap<String, CellValue>>,
}

/// A validated template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    sheet: String,
    blocks: Vec<WorkingBlock>,
    literals: ValueStore,
    formulas: FormulaSet,
    classification: Classification,
    reference: Workbook,
}

impl Template {
    /// Parse a template from its JSON form
    pub fn from_json(json: &str) -> ScenarioResult<Self> {
        let source: TemplateSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    /// Validate a template source.
    ///
    /// Every address must parse; a cell given twice (say `A1` and `$A$1`)
    /// is rejected. Formulas outside the working blocks are not tracked.
    pub fn from_source(source: TemplateSource) -> ScenarioResult<Self> {
        let sheet = source.sheet.unwrap_or_else(|| DEFAULT_SHEET.to_string());
        let blocks = source.blocks;
        let in_blocks = |addr: CellAddress| blocks.iter().any(|b| b.contains(addr));

        let mut literals = ValueStore::new();
        let mut formulas = FormulaSet::new();
        let mut seen = std::collections::HashSet::new();

        for (text, value) in &source.cells {
            let addr = CellAddress::parse(text)?;
            if !seen.insert(addr) {
                return Err(ScenarioError::DuplicateCell(addr.to_a1()));
            }

            match value {
                CellValue::Text(formula) if formula.trim_start().starts_with('=') => {
                    if in_blocks(addr) {
                        formulas.insert(addr, formula);
                    } else {
                        debug!(cell = %addr, "formula outside working blocks ignored");
                    }
                }
                literal => {
                    literals.set(addr, literal.clone());
                }
            }
        }

        let mut classification = Classification::new();
        for addr in formulas.addresses() {
            classification.set(addr, CellClass::Derived);
        }
        for (text, argb) in &source.fills {
            classification.set(CellAddress::parse(text)?, CellClass::from_fill(Some(argb.as_str())));
        }
        for (text, class) in &source.classification {
            classification.set(CellAddress::parse(text)?, class.class());
        }

        let mut reference = Workbook::new();
        for (name, cells) in &source.sheets {
            let values = cells
                .iter()
                .map(|(text, value)| -> ScenarioResult<(CellAddress, CellValue)> {
                    Ok((CellAddress::parse(text)?, value.clone()))
                })
                .collect::<ScenarioResult<ValueStore>>()?;
            reference.insert_sheet(name, values);
        }

        debug!(
            template = %source.name,
            literals = literals.len(),
            formulas = formulas.len(),
            sheets = reference.len(),
            "template loaded"
        );

        Ok(Self {
            name: source.name,
            sheet,
            blocks,
            literals,
            formulas,
            classification,
            reference,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the sheet the template's cells live on
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn blocks(&self) -> &[WorkingBlock] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&WorkingBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn in_blocks(&self, addr: CellAddress) -> bool {
        self.blocks.iter().any(|b| b.contains(addr))
    }

    pub fn literals(&self) -> &ValueStore {
        &self.literals
    }

    pub fn formulas(&self) -> &FormulaSet {
        &self.formulas
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn reference(&self) -> &Workbook {
        &self.reference
    }
}
