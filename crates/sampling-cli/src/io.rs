//! File loading and output rendering

use anyhow::{Context, Result};
use clap::ValueEnum;
use sampling_plan::SamplingConfig;
use sampling_population::Population;
use serde::Serialize;
use std::path::Path;

/// Output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

/// Read a population from a JSON array of objects
pub(crate) fn load_population(path: &Path) -> Result<Population> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read population {}", path.display()))?;
    let population = Population::from_json_str(&input)
        .with_context(|| format!("failed to parse population {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        rows = population.len(),
        columns = population.columns().len(),
        "loaded population"
    );
    Ok(population)
}

/// Read a sampling config from TOML
pub(crate) fn load_config(path: &Path) -> Result<SamplingConfig> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SamplingConfig = toml::from_str(&input)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate_parameters()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Encode a value for stdout
pub(crate) fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("failed to encode JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(value).context("failed to encode YAML"),
    }
}
