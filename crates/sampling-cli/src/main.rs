//! Audit sampling command line
//!
//! Offline front end over the sampling engine: size a sample, inspect a
//! plan, or run a whole plan/sample/lock lifecycle against a JSON
//! population and a TOML config.

mod io;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use io::{load_config, load_population, render, OutputFormat};
use sampling_engine::{LifecycleManager, LockReceipt, Provenance, Sample, SamplingSummary};
use sampling_plan::{add_coverage_overrides, compute_plan, SampleSizeRequest, SamplingPlan};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sampling", version, about = "Reproducible statistical sampling for audit engagements")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the attribute sample size for a population
    Size {
        /// Eligible population size
        #[arg(long)]
        population_size: usize,
        /// Confidence level in (0, 1)
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,
        /// Tolerable error (margin) in (0, 1)
        #[arg(long, default_value_t = 0.05)]
        margin: f64,
        /// Expected error rate in [0, 1)
        #[arg(long, default_value_t = 0.0)]
        expected_error: f64,
        /// Size with the maximum-variance proportion
        #[arg(long)]
        conservative: bool,
    },
    /// Compute and print a sampling plan
    Plan(Inputs),
    /// Plan, sample and optionally lock in one go
    Run {
        #[command(flatten)]
        inputs: Inputs,
        /// Lock the sample after drawing it
        #[arg(long)]
        lock: bool,
        /// Requester recorded in the sample provenance
        #[arg(long)]
        requested_by: Option<String>,
    },
}

#[derive(Debug, Args)]
struct Inputs {
    /// Population file, a JSON array of objects
    #[arg(long)]
    population: PathBuf,
    /// Sampling config file (TOML)
    #[arg(long)]
    config: PathBuf,
    /// Override the config's seed
    #[arg(long)]
    seed: Option<u64>,
    /// Give every non-empty stratum at least one unit
    #[arg(long)]
    coverage: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    plan: SamplingPlan,
    summary: SamplingSummary,
    sample: Sample,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<LockReceipt>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Size {
            population_size,
            confidence,
            margin,
            expected_error,
            conservative,
        } => {
            let size = SampleSizeRequest::new(population_size, confidence, margin)
                .with_expected_error_rate(expected_error)
                .with_conservative(conservative)
                .calculate()
                .context("failed to compute sample size")?;
            println!("{size}");
        }
        Command::Plan(inputs) => {
            let plan = plan(&inputs)?;
            println!("{}", render(&plan, inputs.format)?);
        }
        Command::Run {
            inputs,
            lock,
            requested_by,
        } => {
            let report = run(&inputs, lock, requested_by)?;
            println!("{}", render(&report, inputs.format)?);
        }
    }

    Ok(())
}

fn plan(inputs: &Inputs) -> Result<SamplingPlan> {
    let population = load_population(&inputs.population)?;
    let mut config = load_config(&inputs.config)?;
    if let Some(seed) = inputs.seed {
        config.seed = seed;
    }

    let plan = compute_plan(&population, &config).context("failed to compute plan")?;
    Ok(if inputs.coverage {
        add_coverage_overrides(&plan)
    } else {
        plan
    })
}

fn run(inputs: &Inputs, lock: bool, requested_by: Option<String>) -> Result<RunReport> {
    let population = load_population(&inputs.population)?;
    let mut config = load_config(&inputs.config)?;
    if let Some(seed) = inputs.seed {
        config.seed = seed;
    }

    let manager = LifecycleManager::new();
    let slot = manager.open_slot()?;
    manager
        .compute_plan(slot, &population, config)
        .context("failed to compute plan")?;
    if inputs.coverage {
        manager.add_coverage_overrides(slot)?;
    }

    let mut provenance = Provenance::now();
    if let Some(name) = requested_by {
        provenance = provenance.with_requested_by(name);
    }
    let run = manager
        .run_sampling(slot, &population, provenance)
        .context("failed to draw sample")?;

    let receipt = if lock {
        Some(manager.lock(slot).context("failed to lock sample")?)
    } else {
        None
    };

    // re-read so a lock shows up in the sample and summary
    let sample = manager
        .sample(slot)?
        .context("slot lost its sample")?;
    let summary = manager.summary(slot)?;

    Ok(RunReport {
        plan: run.plan,
        summary,
        sample,
        receipt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn population_file() -> NamedTempFile {
        let rows: Vec<String> = (0..200)
            .map(|i| {
                let country = if i < 197 { "US" } else { "UK" };
                format!(r#"{{"id": "C-{i:03}", "Country": "{country}"}}"#)
            })
            .collect();
        file_with(&format!("[{}]", rows.join(",")))
    }

    fn config_file() -> NamedTempFile {
        file_with(
            r#"
            sampleSizeOverride = 20
            stratifyFields = ["Country"]
            idColumn = "id"
            seed = 5
            "#,
        )
    }

    fn inputs(population: &NamedTempFile, config: &NamedTempFile) -> Inputs {
        Inputs {
            population: population.path().to_path_buf(),
            config: config.path().to_path_buf(),
            seed: None,
            coverage: false,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn plan_applies_coverage_on_request() {
        let (population, config) = (population_file(), config_file());
        let mut inputs = inputs(&population, &config);

        let plain = plan(&inputs).unwrap();
        assert_eq!(plain.planned_size, 20);
        assert!(!plain.coverage_adjusted);

        inputs.coverage = true;
        let covered = plan(&inputs).unwrap();
        assert_eq!(covered.planned_size, 21);
        assert!(covered.coverage_adjusted);
    }

    #[test]
    fn run_with_lock_reports_matching_receipt() {
        let (population, config) = (population_file(), config_file());
        let report = run(&inputs(&population, &config), true, Some("auditor".into())).unwrap();

        let receipt = report.receipt.as_ref().unwrap();
        assert_eq!(receipt.fingerprint, report.sample.fingerprint());
        assert_eq!(receipt.fingerprint, report.summary.fingerprint);
        assert_eq!(report.sample.locked_at, Some(receipt.locked_at));
        assert_eq!(report.summary.locked_at, Some(receipt.locked_at));
        assert_eq!(report.sample.provenance.requested_by.as_deref(), Some("auditor"));
        assert_eq!(receipt.sample_size, 20);
    }

    #[test]
    fn run_without_lock_has_no_receipt() {
        let (population, config) = (population_file(), config_file());
        let report = run(&inputs(&population, &config), false, None).unwrap();
        assert!(report.receipt.is_none());
        assert!(report.sample.locked_at.is_none());
        assert!(render(&report, OutputFormat::Yaml).unwrap().contains("fingerprint"));
    }

    #[test]
    fn seed_override_changes_selection() {
        let (population, config) = (population_file(), config_file());
        let mut inputs = inputs(&population, &config);

        let from_config = run(&inputs, false, None).unwrap();
        assert_eq!(from_config.sample.seed, 5);

        inputs.seed = Some(6);
        let overridden = run(&inputs, false, None).unwrap();
        assert_eq!(overridden.sample.seed, 6);
        assert_ne!(from_config.sample.indices(), overridden.sample.indices());
    }
}
