mod config;
mod report;

use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calcsheet_formula::RecalcOptions;
use calcsheet_scenario::Template;

use crate::config::Config;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Logs go to stderr, stdout carries the JSON result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    tracing::info!(template = %config.template_path.display(), "loading template");

    let template_json = fs::read_to_string(&config.template_path)
        .with_context(|| format!("failed to read {}", config.template_path.display()))?;
    let template = Template::from_json(&template_json).context("invalid template")?;

    let edits = match &config.edits_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            report::parse_edits(&json)?
        }
        None => BTreeMap::new(),
    };

    let options = RecalcOptions {
        max_passes: config.max_passes,
        ..RecalcOptions::default()
    };
    let output = report::run_scenario(template, &config.scenario_name, &edits, options)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
