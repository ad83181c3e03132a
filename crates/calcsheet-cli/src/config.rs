use std::env;
use std::path::PathBuf;

use anyhow::Context;
use calcsheet_formula::DEFAULT_MAX_PASSES;

/// CLI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Template JSON file
    pub template_path: PathBuf,
    /// Optional edits JSON file (`{"E24": 3}`)
    pub edits_path: Option<PathBuf>,
    /// Recalculation pass limit
    pub max_passes: usize,
    /// Name given to the scenario
    pub scenario_name: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let template_path = var("CALCSHEET_TEMPLATE")
            .map(PathBuf::from)
            .context("CALCSHEET_TEMPLATE must point at a template JSON file")?;
        let edits_path = var("CALCSHEET_EDITS").map(PathBuf::from);
        let max_passes = match var("CALCSHEET_MAX_PASSES") {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid CALCSHEET_MAX_PASSES: {value}"))?,
            None => DEFAULT_MAX_PASSES,
        };
        let scenario_name =
            var("CALCSHEET_SCENARIO").unwrap_or_else(|| "Scenario 1".to_string());

        Ok(Self {
            template_path,
            edits_path,
            max_passes,
            scenario_name,
        })
    }
}
