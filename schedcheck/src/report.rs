//! Per-task-set evaluation: analyses, simulations and their cross-check,
//! collected into serializable records.

use std::collections::BTreeMap;
use std::thread;

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::pdc::{self, EdfAnalysis};
use crate::analysis::rta::{self, FixedPriorityAnalysis, ResponseOutcome};
use crate::analysis::{AnalysisError, ErrorKind, Verdict};
use crate::config::AnalysisConfig;
use crate::simulator::{self, MultiRunResult, SimulationResult};
use crate::task::{total_utilization, ExecutionMode, Policy, Time};
use crate::taskset::TaskSet;

// ── Records ───────────────────────────────────────────────────────────────────

/// An analysis that either ran or was refused with a structured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Outcome<T> {
    Completed(T),
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl<T> Outcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            Outcome::Completed(v) => Some(v),
            Outcome::Failed(_) => None,
        }
    }
}

impl<T> From<Result<T, AnalysisError>> for Outcome<T> {
    fn from(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(v) => Outcome::Completed(v),
            Err(e) => Outcome::Failed(Failure {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }
}

/// One configured simulation: a single run, or several seeds aggregated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimulationRecord {
    Single(SimulationResult),
    Aggregated(MultiRunResult),
}

impl SimulationRecord {
    pub fn total_missed(&self) -> u64 {
        match self {
            SimulationRecord::Single(r) => r.total_missed(),
            SimulationRecord::Aggregated(r) => r.total_missed(),
        }
    }
}

/// A disagreement between DM response-time analysis and a DM simulation
/// that runs every job for its WCET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Discrepancy {
    /// Observed response time above the analytical WCRT.
    ResponseAboveBound {
        task: String,
        observed: Time,
        wcrt: Time,
    },
    /// Deadline misses in a set the analysis proved schedulable.
    MissWhileSchedulable { task: String, missed: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CrossCheck {
    Consistent { tasks_checked: usize },
    Inconsistent { discrepancies: Vec<Discrepancy> },
    Skipped { reason: String },
}

impl CrossCheck {
    pub fn is_consistent(&self) -> bool {
        matches!(self, CrossCheck::Consistent { .. })
    }
}

/// Everything computed for one task set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSetReport {
    pub name: String,
    pub task_count: usize,
    pub utilization: f64,
    pub hyperperiod: Option<Time>,
    pub dm: Outcome<FixedPriorityAnalysis>,
    pub edf: Outcome<EdfAnalysis>,
    pub simulations: BTreeMap<Policy, Outcome<SimulationRecord>>,
    pub cross_check: CrossCheck,
}

impl TaskSetReport {
    /// One line per task set for terminal output.
    pub fn summary_line(&self) -> String {
        let misses = |policy: Policy| {
            match self.simulations.get(&policy).and_then(Outcome::completed) {
                Some(r) => r.total_missed().to_string(),
                None => "-".to_string(),
            }
        };
        format!(
            "{name}: U={u:.3} DM={dm} EDF={edf} misses(DM/RM/EDF)={m_dm}/{m_rm}/{m_edf} cross-check={cc}",
            name = self.name,
            u = self.utilization,
            dm = verdict_label(self.dm.completed().map(|a| &a.verdict)),
            edf = verdict_label(self.edf.completed().map(|a| &a.verdict)),
            m_dm = misses(Policy::Dm),
            m_rm = misses(Policy::Rm),
            m_edf = misses(Policy::Edf),
            cc = match &self.cross_check {
                CrossCheck::Consistent { .. } => "ok",
                CrossCheck::Inconsistent { .. } => "FAILED",
                CrossCheck::Skipped { .. } => "skipped",
            },
        )
    }
}

fn verdict_label(verdict: Option<&Verdict>) -> &'static str {
    match verdict {
        Some(Verdict::Schedulable) => "schedulable",
        Some(Verdict::Unschedulable) => "unschedulable",
        Some(Verdict::Inconclusive(_)) => "inconclusive",
        None => "error",
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// Analyse and simulate one task set.
pub fn evaluate(set: &TaskSet, config: &AnalysisConfig) -> TaskSetReport {
    let tasks = &set.tasks;
    let calculator = config.calculator();
    let hyperperiod = match calculator.calculate(tasks) {
        Ok(info) => Some(info.hyperperiod),
        Err(e) => {
            warn!(
                set = %set.name,
                error = %e,
                fallback_horizon = config.simulation.fallback_horizon,
                "Hyperperiod unavailable, analyses and simulations are bounded"
            );
            None
        }
    };

    let dm: Outcome<_> = rta::analyze_dm(tasks, &config.rta).into();
    let l_max = config.pdc.horizon_for(tasks, &calculator);
    let edf: Outcome<_> = pdc::analyze_edf_with(tasks, l_max, &calculator).into();

    let settings = &config.simulation;
    let simulations: BTreeMap<Policy, Outcome<SimulationRecord>> = settings
        .policies
        .iter()
        .map(|&policy| {
            let sim_config = settings.config_for(policy, tasks, &calculator);
            let record = if settings.runs > 1 {
                simulator::simulate_runs_with(tasks, &sim_config, settings.runs, &calculator)
                    .map(SimulationRecord::Aggregated)
            } else {
                simulator::simulate_with(tasks, &sim_config, &calculator).map(SimulationRecord::Single)
            };
            (policy, record.into())
        })
        .collect();

    let cross_check = match dm.completed() {
        None => CrossCheck::Skipped {
            reason: "DM analysis did not run".to_string(),
        },
        Some(analysis) => {
            let reusable = match simulations.get(&Policy::Dm).and_then(Outcome::completed) {
                Some(SimulationRecord::Single(r)) if r.mode == ExecutionMode::Wcet => Some(r.clone()),
                _ => None,
            };
            let wcet_run = match reusable {
                Some(r) => Ok(r),
                None => {
                    let sim_config = settings
                        .config_for(Policy::Dm, tasks, &calculator)
                        .with_mode(ExecutionMode::Wcet);
                    simulator::simulate_with(tasks, &sim_config, &calculator)
                }
            };
            match wcet_run {
                Ok(run) => cross_check(analysis, &run),
                Err(e) => CrossCheck::Skipped {
                    reason: e.to_string(),
                },
            }
        }
    };

    if let Outcome::Failed(f) = &dm {
        warn!(set = %set.name, error = %f.message, "DM analysis refused");
    }
    if let Outcome::Failed(f) = &edf {
        warn!(set = %set.name, error = %f.message, "EDF analysis refused");
    }

    let report = TaskSetReport {
        name: set.name.clone(),
        task_count: tasks.len(),
        utilization: total_utilization(tasks),
        hyperperiod,
        dm,
        edf,
        simulations,
        cross_check,
    };

    info!(
        set = %report.name,
        tasks = report.task_count,
        dm = verdict_label(report.dm.completed().map(|a| &a.verdict)),
        edf = verdict_label(report.edf.completed().map(|a| &a.verdict)),
        cross_check = report.cross_check.is_consistent(),
        "Task set evaluated"
    );

    report
}

/// Compare a DM analysis with a DM simulation that ran every job for its
/// WCET.
///
/// Only tasks whose recurrence converged have a WCRT that bounds observed
/// response times.
pub fn cross_check(analysis: &FixedPriorityAnalysis, run: &SimulationResult) -> CrossCheck {
    if run.policy != Policy::Dm || run.mode != ExecutionMode::Wcet {
        return CrossCheck::Skipped {
            reason: format!("needs a DM simulation in wcet mode, got {} / {:?}", run.policy, run.mode),
        };
    }
    if analysis.overloaded {
        return CrossCheck::Skipped {
            reason: "task set is overloaded; no response-time bounds".to_string(),
        };
    }

    let mut discrepancies = Vec::new();
    let mut tasks_checked = 0;

    for response in &analysis.responses {
        if response.outcome != ResponseOutcome::Converged {
            continue;
        }
        let Some(stats) = run.stats_of(&response.name) else {
            continue;
        };
        tasks_checked += 1;
        if stats.max_response > response.wcrt {
            discrepancies.push(Discrepancy::ResponseAboveBound {
                task: response.name.clone(),
                observed: stats.max_response,
                wcrt: response.wcrt,
            });
        }
    }

    if analysis.is_schedulable() {
        for (name, stats) in &run.per_task {
            if stats.missed > 0 {
                discrepancies.push(Discrepancy::MissWhileSchedulable {
                    task: name.clone(),
                    missed: stats.missed,
                });
            }
        }
    }

    if discrepancies.is_empty() {
        CrossCheck::Consistent { tasks_checked }
    } else {
        warn!(?discrepancies, "Simulation contradicts response-time analysis");
        CrossCheck::Inconsistent { discrepancies }
    }
}

/// Evaluate `sets` on up to `workers` threads; reports keep input order.
///
/// Task sets are independent, so each worker takes a contiguous chunk and
/// nothing is shared but the read-only configuration.
pub fn evaluate_batch(sets: &[TaskSet], config: &AnalysisConfig, workers: usize) -> Vec<TaskSetReport> {
    let workers = workers.clamp(1, sets.len().max(1));
    if workers == 1 {
        return sets.iter().map(|set| evaluate(set, config)).collect();
    }

    let chunk_size = sets.len().div_ceil(workers);
    let mut results: Vec<Vec<TaskSetReport>> = (0..workers).map(|_| Vec::new()).collect();

    thread::scope(|s| {
        for (out, chunk) in results.iter_mut().zip(sets.chunks(chunk_size)) {
            s.spawn(move || {
                *out = chunk.iter().map(|set| evaluate(set, config)).collect();
            });
        }
    });

    info!(sets = sets.len(), workers, "Batch evaluation finished");
    results.into_iter().flatten().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
