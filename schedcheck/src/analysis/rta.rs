//! Response-time analysis for preemptive fixed-priority scheduling.
//!
//! For each task `i`, in priority order, the worst-case response time is the
//! least fixed point of
//!
//! ```text
//! R = C_i + Σ_{j ∈ hp(i)} ⌈(R + J_j) / T_j⌉ · C_j
//! ```
//!
//! starting from `R = C_i`, where `hp(i)` are the tasks ordered strictly
//! before `i`.  The iterates are non-decreasing, so once `R + J_i` exceeds
//! `D_i` the task can never become feasible again and the search stops
//! early.  With zero jitter this is the classic Joseph & Pandya recurrence.
//!
//! A task whose iteration bound runs out before the sequence settles is
//! reported as [`ResponseOutcome::NonConvergence`] and turns the system
//! verdict [`Inconclusive`](Verdict::Inconclusive) unless another task is
//! already proven to miss.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::feasibility::{check_liu_layland, liu_layland_bound};
use crate::analysis::{AnalysisError, Limitation, Verdict};
use crate::task::{
    exceeds_full_utilization, signed_difference, total_utilization, validate_task_set,
    DeadlineModel, FixedPriority, Task, Time,
};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Default bound on fixed-point iterations per task.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1_000;

/// Tuning knobs for response-time analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtaConfig {
    /// Iterations allowed per task before giving up with `NonConvergence`.
    pub max_iterations: u32,
}

impl Default for RtaConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// How the fixed-point search for one task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// `R` reached a fixed point.
    Converged,
    /// An iterate exceeded the deadline; `wcrt` holds that iterate.
    DeadlineExceeded,
    /// The iteration bound ran out; `wcrt` holds the last iterate.
    NonConvergence,
}

/// Response-time result for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResponse {
    pub name: String,
    /// Worst-case response time (see [`ResponseOutcome`] for its meaning
    /// when the search did not converge).
    pub wcrt: Time,
    pub deadline: Time,
    pub jitter: Time,
    /// Number of recurrence evaluations performed.
    pub iterations: u32,
    pub outcome: ResponseOutcome,
}

impl TaskResponse {
    /// `true` if the search converged and `wcrt + jitter <= deadline`.
    pub fn meets_deadline(&self) -> bool {
        self.outcome == ResponseOutcome::Converged
            && self.wcrt.saturating_add(self.jitter) <= self.deadline
    }

    /// `true` if the task is proven to miss its deadline.
    pub fn misses_deadline(&self) -> bool {
        self.outcome != ResponseOutcome::NonConvergence && !self.meets_deadline()
    }

    /// `deadline - (wcrt + jitter)`; negative when the deadline is missed.
    pub fn slack(&self) -> i64 {
        signed_difference(self.deadline, self.wcrt.saturating_add(self.jitter))
    }
}

/// Result of analysing a whole task set under a fixed-priority ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedPriorityAnalysis {
    pub ordering: FixedPriority,
    /// Task names from highest to lowest priority.
    pub order: Vec<String>,
    /// Per-task results in priority order.  Empty when `overloaded`.
    pub responses: Vec<TaskResponse>,
    pub utilization: f64,
    /// `Σ C/T > 1`: rejected without running the recurrence.
    pub overloaded: bool,
    /// The Liu & Layland density bound alone already proves schedulability.
    pub utilization_bound_passed: bool,
    pub verdict: Verdict,
}

impl FixedPriorityAnalysis {
    pub fn is_schedulable(&self) -> bool {
        self.verdict.is_schedulable()
    }

    pub fn response_of(&self, name: &str) -> Option<&TaskResponse> {
        self.responses.iter().find(|r| r.name == name)
    }

    /// WCRT of the named task, if it was analysed.
    pub fn wcrt_of(&self, name: &str) -> Option<Time> {
        self.response_of(name).map(|r| r.wcrt)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Deadline-Monotonic response-time analysis.
///
/// # Errors
/// See [`analyze_fixed_priority`].
pub fn analyze_dm(tasks: &[Task], config: &RtaConfig) -> Result<FixedPriorityAnalysis, AnalysisError> {
    analyze_fixed_priority(tasks, FixedPriority::DeadlineMonotonic, config)
}

/// Response-time analysis under the given static priority ordering.
///
/// # Errors
/// * Any task-set validation error under the constrained-deadline model
///   (see [`validate_task_set`]).
/// * [`AnalysisError::ZeroIterationBound`] if `config.max_iterations == 0`.
pub fn analyze_fixed_priority(
    tasks: &[Task],
    ordering: FixedPriority,
    config: &RtaConfig,
) -> Result<FixedPriorityAnalysis, AnalysisError> {
    validate_task_set(tasks, DeadlineModel::Constrained)?;
    if config.max_iterations == 0 {
        return Err(AnalysisError::ZeroIterationBound);
    }

    let ordered = ordering.order(tasks);
    let order: Vec<String> = ordered.iter().map(|t| t.name.clone()).collect();
    let utilization = total_utilization(tasks);

    if exceeds_full_utilization(tasks) {
        info!(
            ?ordering,
            utilization, "Utilization exceeds 1, unschedulable without iteration"
        );
        return Ok(FixedPriorityAnalysis {
            ordering,
            order,
            responses: Vec::new(),
            utilization,
            overloaded: true,
            utilization_bound_passed: false,
            verdict: Verdict::Unschedulable,
        });
    }

    let utilization_bound_passed = match check_liu_layland(tasks) {
        None => true,
        Some(density) => {
            debug!(
                density,
                bound = liu_layland_bound(tasks.len()),
                "Density above Liu & Layland bound, relying on RTA"
            );
            false
        }
    };

    let responses: Vec<TaskResponse> = ordered
        .iter()
        .enumerate()
        .map(|(i, task)| response_time(task, &ordered[..i], config.max_iterations))
        .collect();

    let verdict = system_verdict(&responses);

    info!(
        ?ordering,
        task_count = tasks.len(),
        utilization,
        schedulable = verdict.is_schedulable(),
        "Response-time analysis complete"
    );

    Ok(FixedPriorityAnalysis {
        ordering,
        order,
        responses,
        utilization,
        overloaded: false,
        utilization_bound_passed,
        verdict,
    })
}

/// Interference of `higher` on a window of length `r`.
pub fn interference(r: Time, higher: &[&Task]) -> Time {
    higher.iter().fold(0, |acc: Time, hp| {
        let releases = r.saturating_add(hp.jitter).div_ceil(hp.period);
        acc.saturating_add(releases.saturating_mul(hp.wcet))
    })
}

/// The unbounded sequence of recurrence iterates `R_0 = C_i, R_1, …`.
///
/// The sequence is non-decreasing; callers bound it themselves.
pub fn iterates<'a>(task: &'a Task, higher: &'a [&'a Task]) -> impl Iterator<Item = Time> + 'a {
    std::iter::successors(Some(task.wcet), move |&r| {
        Some(task.wcet.saturating_add(interference(r, higher)))
    })
}

/// Fixed-point search for one task against its higher-priority set.
pub fn response_time(task: &Task, higher: &[&Task], max_iterations: u32) -> TaskResponse {
    let mut seq = iterates(task, higher);
    let mut r = seq.next().unwrap_or(task.wcet);

    let finish = |wcrt, iterations, outcome| TaskResponse {
        name: task.name.clone(),
        wcrt,
        deadline: task.deadline,
        jitter: task.jitter,
        iterations,
        outcome,
    };

    for (iterations, next) in (1..=max_iterations).zip(seq) {
        if next == r {
            debug!(task = %task.name, wcrt = r, iterations, "converged");
            return finish(r, iterations, ResponseOutcome::Converged);
        }
        if next.saturating_add(task.jitter) > task.deadline {
            debug!(
                task = %task.name,
                response = next,
                deadline = task.deadline,
                iterations,
                "deadline exceeded"
            );
            return finish(next, iterations, ResponseOutcome::DeadlineExceeded);
        }
        r = next;
    }

    warn!(
        task = %task.name,
        last_response = r,
        max_iterations,
        "response time did not converge"
    );
    finish(r, max_iterations, ResponseOutcome::NonConvergence)
}

/// A proven miss outranks a limitation; a limitation outranks success.
fn system_verdict(responses: &[TaskResponse]) -> Verdict {
    if responses.iter().any(TaskResponse::misses_deadline) {
        return Verdict::Unschedulable;
    }
    match responses
        .iter()
        .find(|r| r.outcome == ResponseOutcome::NonConvergence)
    {
        Some(r) => Verdict::Inconclusive(Limitation::NonConvergence {
            task: r.name.clone(),
            iterations: r.iterations,
            last_response: r.wcrt,
        }),
        None => Verdict::Schedulable,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
