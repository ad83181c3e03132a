use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use calcsheet_core::CellValue;
use calcsheet_formula::{RecalcOptions, RecalcReport};
use calcsheet_scenario::{ScenarioId, ScenarioRegistry, Template};

/// What the CLI prints: the recalculated working blocks of one scenario
#[derive(Debug, Serialize)]
pub struct Output {
    pub scenario: String,
    pub id: ScenarioId,
    pub report: RecalcReport,
    pub blocks: BTreeMap<String, BTreeMap<String, CellValue>>,
}

/// Parse edits JSON; text values are read the way user input is
pub fn parse_edits(json: &str) -> anyhow::Result<BTreeMap<String, CellValue>> {
    let raw: BTreeMap<String, CellValue> =
        serde_json::from_str(json).context("edits must be a JSON object of address -> value")?;

    Ok(raw
        .into_iter()
        .map(|(addr, value)| {
            let value = match value {
                CellValue::Text(text) => CellValue::from_input(&text),
                other => other,
            };
            (addr, value)
        })
        .collect())
}

/// Build a scenario from `template`, apply `edits`, recalculate and collect
/// every working block.
pub fn run_scenario(
    template: Template,
    name: &str,
    edits: &BTreeMap<String, CellValue>,
    options: RecalcOptions,
) -> anyhow::Result<Output> {
    let mut registry = ScenarioRegistry::new();
    let id = registry.create(name, Arc::new(template));
    let scenario = registry.get_mut(id)?;

    let applied = scenario
        .apply_edits(edits.iter().map(|(addr, value)| (addr.as_str(), value.clone())))
        .context("failed to apply edits")?;
    tracing::info!(applied, "edits applied");

    let report = scenario.recalculate(options);

    let mut blocks = BTreeMap::new();
    for block in scenario.template().blocks() {
        let cells = scenario
            .export_block(&block.name)?
            .into_iter()
            .map(|(addr, value)| (addr.to_a1(), value))
            .collect();
        blocks.insert(block.name.clone(), cells);
    }

    Ok(Output {
        scenario: scenario.name().to_string(),
        id,
        report,
        blocks,
    })
}
