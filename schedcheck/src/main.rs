/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use schedcheck::config::AnalysisConfig;
use schedcheck::report::{self, TaskSetReport};
use schedcheck::task::{ExecutionMode, Policy, Time};
use schedcheck::taskset::{collect_task_set_files, load_task_set};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Schedulability analysis and simulation for periodic task sets.
///
/// Example:
///   schedcheck sets/ --config analysis.yaml --policy dm --policy edf -j 4
#[derive(Debug, Parser)]
#[command(
    name = "schedcheck",
    about = "DM response-time analysis, EDF processor-demand test and scheduling simulation",
    long_about = None,
)]
struct Cli {
    /// Task-set YAML files, or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Path to the YAML analysis configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Simulation horizon; defaults to one hyperperiod.
    #[arg(long)]
    horizon: Option<Time>,

    /// Execution-time sampling for simulation.
    #[arg(short = 'm', long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Seed of the first simulation run.
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Simulation runs per policy, with consecutive seeds.
    #[arg(short = 'r', long)]
    runs: Option<usize>,

    /// Policies to simulate (repeatable).
    #[arg(short = 'p', long = "policy", value_enum)]
    policies: Vec<Policy>,

    /// Worker threads for batch evaluation.
    #[arg(short = 'j', long, default_value_t = 1)]
    jobs: usize,

    /// Print one summary line per task set instead of the YAML report.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut AnalysisConfig) {
        let sim = &mut config.simulation;
        if self.horizon.is_some() {
            sim.horizon = self.horizon;
        }
        if let Some(mode) = self.mode {
            sim.mode = mode;
        }
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if let Some(runs) = self.runs {
            sim.runs = runs;
        }
        if !self.policies.is_empty() {
            sim.policies = self.policies.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = AnalysisConfig::load_or_default(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid command-line overrides")?;

    info!(
        inputs = cli.inputs.len(),
        jobs = cli.jobs,
        mode = ?config.simulation.mode,
        seed = config.simulation.seed,
        runs = config.simulation.runs,
        policies = ?config.simulation.policies,
        "Configuration"
    );

    let files = collect_task_set_files(&cli.inputs)?;
    let sets = files
        .iter()
        .map(|path| load_task_set(path))
        .collect::<Result<Vec<_>>>()?;

    let reports = report::evaluate_batch(&sets, &config, cli.jobs);
    print_reports(&reports, cli.summary)
}

fn print_reports(reports: &[TaskSetReport], summary: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if summary {
        for report in reports {
            writeln!(out, "{}", report.summary_line())?;
        }
    } else {
        let yaml = serde_yaml::to_string(reports).context("Failed to serialize report")?;
        out.write_all(yaml.as_bytes())?;
    }
    Ok(())
}
