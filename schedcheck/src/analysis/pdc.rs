//! EDF schedulability by the processor-demand criterion.
//!
//! A synchronous periodic task set is EDF-schedulable on one processor iff
//! for every window length `L > 0`
//!
//! ```text
//! h(L) = Σ_i dbf(i, L) ≤ L,   dbf(i, L) = max(0, ⌊(L − D_i) / T_i⌋ + 1) · C_i
//! ```
//!
//! `h` only steps at absolute deadlines `k·T_i + D_i`, so the test is
//! evaluated at those candidate instants up to a caller-supplied `L_max`.
//! The answer is exact only if `L_max` reaches [`sufficient_horizon`]; a
//! shorter window that shows no violation yields
//! [`Limitation::HorizonTooSmall`] instead of a schedulable verdict.
//!
//! Release jitter `J_i` shortens the effective deadline to `D_i − J_i`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisError, Limitation, Verdict};
use crate::hyperperiod::HyperperiodCalculator;
use crate::task::{
    exceeds_full_utilization, signed_difference, total_utilization, validate_task_set,
    DeadlineModel, Task, Time,
};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Default `K` in `L_max = min(K · max_period, cap)`.
pub const DEFAULT_PERIOD_MULTIPLIER: Time = 1_000;

/// Default absolute cap on `L_max`.
pub const DEFAULT_ABSOLUTE_CAP: Time = 1_000_000;

/// How [`PdcConfig::horizon_for`] chooses `L_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdcConfig {
    pub period_multiplier: Time,
    pub absolute_cap: Time,
}

impl Default for PdcConfig {
    fn default() -> Self {
        Self {
            period_multiplier: DEFAULT_PERIOD_MULTIPLIER,
            absolute_cap: DEFAULT_ABSOLUTE_CAP,
        }
    }
}

impl PdcConfig {
    /// `L_max` for `tasks`: the exact [`sufficient_horizon`] when it is no
    /// larger than `min(K · max_period, cap)`, otherwise that fallback.
    pub fn horizon_for(&self, tasks: &[Task], calculator: &HyperperiodCalculator) -> Time {
        let max_period = tasks.iter().map(|t| t.period).max().unwrap_or(0);
        let fallback = self
            .period_multiplier
            .saturating_mul(max_period)
            .min(self.absolute_cap);

        match sufficient_horizon(tasks, calculator) {
            Some(exact) if exact <= fallback => exact,
            _ => fallback,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// The first candidate instant at which demand exceeded supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub at: Time,
    pub demand: Time,
    /// `demand − at`, always positive.
    pub excess: Time,
}

/// Result of the processor-demand test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdfAnalysis {
    /// `L_max` the test was asked to cover.
    pub horizon: Time,
    /// Distinct candidate instants in `(0, L_max]`.
    pub candidate_points: usize,
    /// Candidate instants actually evaluated (fewer than
    /// `candidate_points` when a violation stops the test early).
    pub checked_points: usize,
    /// Maximum `demand(L) − L` seen; negative means slack everywhere.
    pub worst_violation: Option<i64>,
    /// Instant at which `worst_violation` occurred.
    pub worst_instant: Option<Time>,
    pub violation: Option<Violation>,
    pub utilization: f64,
    /// `Σ C/T > 1`: rejected without evaluating any candidate.
    pub overloaded: bool,
    pub verdict: Verdict,
}

impl EdfAnalysis {
    pub fn is_schedulable(&self) -> bool {
        self.verdict.is_schedulable()
    }
}

// ── Demand bound ──────────────────────────────────────────────────────────────

/// Demand of `task` from jobs released and due within any window of length
/// `l`.  Zero for `l` below the effective deadline.
pub fn dbf(task: &Task, l: Time) -> Time {
    let d = task.effective_deadline();
    if l < d || task.period == 0 {
        return 0;
    }
    let jobs = (l - d) / task.period + 1;
    jobs.saturating_mul(task.wcet)
}

/// Total demand `h(l)`.
pub fn demand(tasks: &[Task], l: Time) -> Time {
    tasks
        .iter()
        .fold(0, |acc: Time, t| acc.saturating_add(dbf(t, l)))
}

/// All absolute deadlines `k·T + D ≤ l_max`, deduplicated and ascending.
pub fn candidate_points(tasks: &[Task], l_max: Time) -> BTreeSet<Time> {
    let mut points = BTreeSet::new();
    for task in tasks.iter().filter(|t| t.period > 0) {
        let mut l = task.effective_deadline();
        while l <= l_max && l > 0 {
            points.insert(l);
            match l.checked_add(task.period) {
                Some(next) => l = next,
                None => break,
            }
        }
    }
    points
}

/// Smallest `L_max` for which a violation-free check is exact.
///
/// `min(H + D_max, L_a)` where `H` is the hyperperiod and
/// `L_a = max(D_max, Σ (T_i − D_i)·U_i / (1 − U))` is only defined for
/// `U < 1`.  `None` when neither bound is available.
pub fn sufficient_horizon(tasks: &[Task], calculator: &HyperperiodCalculator) -> Option<Time> {
    let d_max = tasks.iter().map(Task::effective_deadline).max()?;

    let busy_bound = calculator
        .calculate(tasks)
        .ok()
        .and_then(|info| info.hyperperiod.checked_add(d_max));

    let utilization = total_utilization(tasks);
    let la_bound = (utilization < 1.0).then(|| {
        let weighted: f64 = tasks
            .iter()
            .map(|t| t.period.saturating_sub(t.effective_deadline()) as f64 * t.utilization())
            .sum();
        let la = (weighted / (1.0 - utilization)).ceil();
        if la.is_finite() && la < Time::MAX as f64 {
            (la as Time).max(d_max)
        } else {
            Time::MAX
        }
    });

    match (busy_bound, la_bound) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b).filter(|&v| v < Time::MAX),
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Run the processor-demand test over `(0, l_max]`.
///
/// # Errors
/// Any task-set validation error under the constrained-deadline model.
pub fn analyze_edf(tasks: &[Task], l_max: Time) -> Result<EdfAnalysis, AnalysisError> {
    analyze_edf_with(tasks, l_max, &HyperperiodCalculator::new())
}

/// [`analyze_edf`] with an explicit hyperperiod limit.
///
/// # Errors
/// Any task-set validation error under the constrained-deadline model.
pub fn analyze_edf_with(
    tasks: &[Task],
    l_max: Time,
    calculator: &HyperperiodCalculator,
) -> Result<EdfAnalysis, AnalysisError> {
    validate_task_set(tasks, DeadlineModel::Constrained)?;

    let utilization = total_utilization(tasks);
    let mut result = EdfAnalysis {
        horizon: l_max,
        candidate_points: 0,
        checked_points: 0,
        worst_violation: None,
        worst_instant: None,
        violation: None,
        utilization,
        overloaded: false,
        verdict: Verdict::Unschedulable,
    };

    if exceeds_full_utilization(tasks) {
        info!(utilization, "Utilization exceeds 1, unschedulable under EDF");
        result.overloaded = true;
        return Ok(result);
    }

    let candidates = candidate_points(tasks, l_max);
    result.candidate_points = candidates.len();
    debug!(l_max, candidates = candidates.len(), "Evaluating processor demand");

    for l in candidates {
        let h = demand(tasks, l);
        let margin = signed_difference(h, l);
        result.checked_points += 1;

        if result.worst_violation.map_or(true, |w| margin > w) {
            result.worst_violation = Some(margin);
            result.worst_instant = Some(l);
        }

        if h > l {
            info!(
                at = l,
                demand = h,
                checked = result.checked_points,
                "Processor demand exceeds supply"
            );
            result.violation = Some(Violation {
                at: l,
                demand: h,
                excess: h - l,
            });
            return Ok(result);
        }
    }

    let required = sufficient_horizon(tasks, calculator);
    result.verdict = match required {
        Some(bound) if l_max >= bound => Verdict::Schedulable,
        _ => {
            warn!(
                l_max,
                required = ?required,
                "No demand violation found, but the horizon is too short for an exact answer"
            );
            Verdict::Inconclusive(Limitation::HorizonTooSmall {
                checked_up_to: l_max,
                required,
            })
        }
    };

    info!(
        l_max,
        checked = result.checked_points,
        schedulable = result.verdict.is_schedulable(),
        "Processor-demand analysis complete"
    );
    Ok(result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
