//! Fixed-point recalculation of a formula set.
//!
//! Every pass evaluates each formula cell in row-major order against the
//! current value store and writes changed values back immediately, so later
//! cells in the same pass already see them. Passes repeat until one makes no
//! change or the pass limit is reached. A formula that fails to evaluate
//! leaves its cell empty for that pass; the rest of the pass continues.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use calcsheet_core::{strip_revision_markers, CellAddress, CellValue, Classification, ValueStore, Workbook};

use crate::dependency::DependencyGraph;
use crate::evaluator::Evaluator;
use crate::parser::{transform, Formula};
use crate::resolver::Resolver;

pub const DEFAULT_MAX_PASSES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcOptions {
    /// Upper bound on convergence passes
    pub max_passes: usize,
    /// Build the dependency graph first and report circular references
    pub detect_cycles: bool,
}

impl Default for RecalcOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            detect_cycles: true,
        }
    }
}

/// Outcome of one recalculation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    /// Passes run, including the final pass that found nothing to change
    pub passes: usize,
    /// Cell writes over all passes
    pub changes: usize,
    /// Whether a pass completed with zero changes
    pub converged: bool,
    /// Circular reference groups found before iterating
    pub cycles: Vec<Vec<CellAddress>>,
}

/// A cell whose value comes from a formula
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCell {
    pub addr: CellAddress,
    pub formula: Formula,
}

impl FormulaCell {
    pub fn new(addr: CellAddress, formula_text: &str) -> Self {
        Self {
            addr,
            formula: transform(formula_text),
        }
    }
}

/// The formula cells of one template, kept in row-major order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaSet {
    cells: BTreeMap<CellAddress, FormulaCell>,
}

impl FormulaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the formula at `addr`
    pub fn insert(&mut self, addr: CellAddress, formula_text: &str) -> Option<FormulaCell> {
        self.cells.insert(addr, FormulaCell::new(addr, formula_text))
    }

    pub fn get(&self, addr: CellAddress) -> Option<&FormulaCell> {
        self.cells.get(&addr)
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        self.cells.contains_key(&addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormulaCell> {
        self.cells.values()
    }

    pub fn addresses(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.cells.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Graph of formula cells reading other formula cells on `sheet` (the
    /// sheet unqualified references point at).
    pub fn dependency_graph(&self, sheet: Option<&str>) -> DependencyGraph {
        let current = sheet.map(|s| strip_revision_markers(s).trim().to_string());
        let mut graph = DependencyGraph::new();

        for cell in self.iter() {
            let deps: BTreeSet<CellAddress> = cell
                .formula
                .references()
                .iter()
                .filter(|range| match &range.sheet {
                    None => true,
                    Some(name) => current.as_deref() == Some(name.trim()),
                })
                .flat_map(|range| self.addresses().filter(move |addr| range.contains(*addr)))
                .collect();
            graph.set_dependencies(cell.addr, deps);
        }

        graph
    }
}

impl<S: AsRef<str>> FromIterator<(CellAddress, S)> for FormulaSet {
    fn from_iter<I: IntoIterator<Item = (CellAddress, S)>>(iter: I) -> Self {
        let mut set = FormulaSet::new();
        for (addr, text) in iter {
            set.insert(addr, text.as_ref());
        }
        set
    }
}

/// Drives a [`FormulaSet`] to a fixed point over one [`ValueStore`].
#[derive(Debug, Clone, Default)]
pub struct Recalculator<'a> {
    book: Option<&'a Workbook>,
    sheet: Option<&'a str>,
    classification: Option<&'a Classification>,
    options: RecalcOptions,
}

impl<'a> Recalculator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference sheets for cross-sheet lookups
    pub fn with_workbook(mut self, book: &'a Workbook) -> Self {
        self.book = Some(book);
        self
    }

    /// Name of the sheet the value store holds
    pub fn with_sheet(mut self, sheet: &'a str) -> Self {
        self.sheet = Some(sheet);
        self
    }

    /// Cells classified as input are never overwritten
    pub fn with_classification(mut self, classification: &'a Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_options(mut self, options: RecalcOptions) -> Self {
        self.options = options;
        self
    }

    fn resolver<'s>(&self, store: &'s ValueStore) -> Resolver<'s>
    where
        'a: 's,
    {
        let mut resolver = Resolver::new(store);
        if let Some(book) = self.book {
            resolver = resolver.with_workbook(book);
        }
        if let Some(sheet) = self.sheet {
            resolver = resolver.with_sheet(sheet);
        }
        resolver
    }

    fn is_input(&self, addr: CellAddress) -> bool {
        self.classification.is_some_and(|c| c.is_input(addr))
    }

    /// Evaluate one formula against the current store, failures read as empty
    fn evaluate(&self, cell: &FormulaCell, store: &ValueStore) -> CellValue {
        let evaluator = Evaluator::new(self.resolver(store));
        match evaluator.evaluate_formula(&cell.formula) {
            Ok(value) => value,
            Err(err) => {
                trace!(cell = %cell.addr, formula = cell.formula.source(), error = %err, "evaluation failed");
                CellValue::Empty
            }
        }
    }

    /// Recalculate `formulas` in place until a pass changes nothing or the
    /// pass limit is reached.
    pub fn run(&self, formulas: &FormulaSet, store: &mut ValueStore) -> RecalcReport {
        let mut report = RecalcReport::default();

        if self.options.detect_cycles {
            report.cycles = formulas.dependency_graph(self.sheet).cycles();
            for cycle in &report.cycles {
                let cells: Vec<String> = cycle.iter().map(CellAddress::to_a1).collect();
                warn!(cells = ?cells, "circular reference detected");
            }
        }

        while report.passes < self.options.max_passes {
            report.passes += 1;
            let mut changed = 0;

            for cell in formulas.iter() {
                if self.is_input(cell.addr) {
                    continue;
                }

                let value = self.evaluate(cell, store);
                if *store.get(cell.addr) != value {
                    trace!(cell = %cell.addr, value = ?value, "cell changed");
                    store.set(cell.addr, value);
                    changed += 1;
                }
            }

            report.changes += changed;
            debug!(pass = report.passes, changed, "recalculation pass");

            if changed == 0 {
                report.converged = true;
                break;
            }
        }

        if !report.converged {
            warn!(
                passes = report.passes,
                "recalculation stopped at the pass limit without converging"
            );
        }

        report
    }
}
