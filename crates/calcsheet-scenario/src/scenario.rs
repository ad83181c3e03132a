use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use calcsheet_core::{CellAddress, CellValue, ValueStore};
use calcsheet_formula::{RecalcOptions, RecalcReport, Recalculator};

use crate::error::{ScenarioError, ScenarioResult};
use crate::template::Template;

/// Identifies one scenario within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(Uuid);

impl ScenarioId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One calculator instance: a value store over a shared template
#[derive(Debug, Clone)]
pub struct Scenario {
    id: ScenarioId,
    name: String,
    template: Arc<Template>,
    store: ValueStore,
}

impl Scenario {
    pub fn new(name: impl Into<String>, template: Arc<Template>) -> Self {
        let scenario = Self {
            id: ScenarioId::new(),
            name: name.into(),
            store: template.literals().clone(),
            template,
        };
        info!(scenario = %scenario.id, name = %scenario.name, "scenario created");
        scenario
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn value(&self, addr: CellAddress) -> &CellValue {
        self.store.get(addr)
    }

    /// Write a user value into an input cell, returning the previous value
    pub fn apply_edit(
        &mut self,
        addr: CellAddress,
        value: impl Into<CellValue>,
    ) -> ScenarioResult<CellValue> {
        if !self.template.in_blocks(addr) {
            return Err(ScenarioError::OutsideBlocks(addr.to_a1()));
        }
        if !self.template.classification().is_input(addr) {
            return Err(ScenarioError::ReadOnlyCell(addr.to_a1()));
        }
        Ok(self.store.set(addr, value))
    }

    /// Apply a batch of edits keyed by address text; stops at the first
    /// rejected edit.
    pub fn apply_edits<'e, I>(&mut self, edits: I) -> ScenarioResult<usize>
    where
        I: IntoIterator<Item = (&'e str, CellValue)>,
    {
        let mut applied = 0;
        for (text, value) in edits {
            let addr = CellAddress::parse(text)?;
            self.apply_edit(addr, value)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Drop every edit and computed value, back to the template literals
    pub fn reset(&mut self) {
        self.store = self.template.literals().clone();
        info!(scenario = %self.id, "scenario reset");
    }

    /// Run the recalculation engine over this scenario's store
    pub fn recalculate(&mut self, options: RecalcOptions) -> RecalcReport {
        let template = &self.template;
        let report = Recalculator::new()
            .with_workbook(template.reference())
            .with_sheet(template.sheet())
            .with_classification(template.classification())
            .with_options(options)
            .run(template.formulas(), &mut self.store);

        info!(
            scenario = %self.id,
            passes = report.passes,
            changes = report.changes,
            converged = report.converged,
            "scenario recalculated"
        );
        report
    }

    /// Addresses and values of a working block in row-major order, for
    /// write-back at the same addresses.
    pub fn export_block(&self, name: &str) -> ScenarioResult<Vec<(CellAddress, CellValue)>> {
        let block = self
            .template
            .block(name)
            .ok_or_else(|| ScenarioError::UnknownBlock(name.to_string()))?;

        Ok(block
            .range
            .iter()
            .map(|addr| (addr, self.store.get(addr).clone()))
            .collect())
    }
}

/// Independently owned scenarios keyed by id
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: HashMap<ScenarioId, Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scenario from `template` and return its id
    pub fn create(&mut self, name: impl Into<String>, template: Arc<Template>) -> ScenarioId {
        let scenario = Scenario::new(name, template);
        let id = scenario.id();
        self.scenarios.insert(id, scenario);
        id
    }

    pub fn get(&self, id: ScenarioId) -> ScenarioResult<&Scenario> {
        self.scenarios
            .get(&id)
            .ok_or(ScenarioError::UnknownScenario(id))
    }

    pub fn get_mut(&mut self, id: ScenarioId) -> ScenarioResult<&mut Scenario> {
        self.scenarios
            .get_mut(&id)
            .ok_or(ScenarioError::UnknownScenario(id))
    }

    pub fn remove(&mut self, id: ScenarioId) -> ScenarioResult<Scenario> {
        let scenario = self
            .scenarios
            .remove(&id)
            .ok_or(ScenarioError::UnknownScenario(id))?;
        info!(scenario = %id, "scenario removed");
        Ok(scenario)
    }

    /// Ids and names, sorted by name
    pub fn list(&self) -> Vec<(ScenarioId, &str)> {
        let mut entries: Vec<(ScenarioId, &str)> = self
            .scenarios
            .values()
            .map(|s| (s.id(), s.name()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
