/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures shared by the analyzers and the simulator.
//!
//! ```text
//! task-set file ──(taskset)──►  Vec<Task>  ──►  analysis::rta   ──►  FixedPriorityAnalysis
//!                                    │      ──►  analysis::pdc   ──►  EdfAnalysis
//!                                    └────  ──►  simulator       ──►  SimulationResult
//! ```
//!
//! # Ownership model
//! A [`Task`] is constructed once from external input and never mutated
//! afterwards.  Every analysis entry point borrows `&[Task]`; the simulator
//! creates its own [`Job`](crate::simulator::job::Job) records and only ever
//! holds read-only references back to the tasks.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::error::AnalysisError;
use crate::hyperperiod::math::gcd;

/// Type of time instants and durations.
///
/// The unit is left to the task-set author (typically µs or ms); all
/// arithmetic is integral.
pub type Time = u64;

/// `a - b` as a signed value, saturating at the `i64` bounds.
pub fn signed_difference(a: Time, b: Time) -> i64 {
    let diff = i128::from(a) - i128::from(b);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

// ── Validation errors ─────────────────────────────────────────────────────────

/// Why a single task violates the task-model invariants.
///
/// These are all `InvalidTaskParameter` failures: fatal, and rejected before
/// any analysis or simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task name must not be empty")]
    EmptyName,

    #[error("task '{task}': period must be positive")]
    ZeroPeriod { task: String },

    #[error("task '{task}': relative deadline must be positive")]
    ZeroDeadline { task: String },

    /// Only raised by [`Task::validate_constrained`].
    #[error("task '{task}': deadline {deadline} exceeds period {period} (analyzers require deadline <= period)")]
    DeadlineExceedsPeriod {
        task: String,
        deadline: Time,
        period: Time,
    },

    /// Only raised by [`Task::validate_constrained`].
    #[error("task '{task}': release jitter {jitter} leaves no time before deadline {deadline}")]
    JitterExceedsDeadline {
        task: String,
        jitter: Time,
        deadline: Time,
    },
}

// ── Policies ──────────────────────────────────────────────────────────────────

/// Scheduling policy tag understood by the simulator and carried in reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Deadline Monotonic: static priorities, shorter relative deadline first.
    Dm,
    /// Rate Monotonic: static priorities, shorter period first.
    Rm,
    /// Earliest Deadline First: dynamic priorities by absolute deadline.
    Edf,
}

impl Policy {
    /// The static priority ordering behind a fixed-priority policy, `None`
    /// for EDF.
    pub fn fixed_priority(self) -> Option<FixedPriority> {
        match self {
            Policy::Dm => Some(FixedPriority::DeadlineMonotonic),
            Policy::Rm => Some(FixedPriority::RateMonotonic),
            Policy::Edf => None,
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Dm => write!(f, "DM"),
            Policy::Rm => write!(f, "RM"),
            Policy::Edf => write!(f, "EDF"),
        }
    }
}

/// Static priority assignment used by response-time analysis and by the
/// fixed-priority simulator policies.
///
/// Both orderings break ties on the remaining timing parameter and then on
/// the task name, so the order is total whenever names are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedPriority {
    /// Key `(deadline, period, name)`.
    #[default]
    DeadlineMonotonic,
    /// Key `(period, deadline, name)`.
    RateMonotonic,
}

impl FixedPriority {
    /// Compare two tasks; `Less` means `a` has the higher priority.
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            FixedPriority::DeadlineMonotonic => (a.deadline, a.period, &a.name)
                .cmp(&(b.deadline, b.period, &b.name)),
            FixedPriority::RateMonotonic => (a.period, a.deadline, &a.name)
                .cmp(&(b.period, b.deadline, &b.name)),
        }
    }

    /// Return the tasks sorted from highest to lowest priority.
    pub fn order<'a>(self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let mut ordered: Vec<&Task> = tasks.iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b));
        ordered
    }
}

/// How the simulator draws the execution time of each released job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Every job runs for exactly `wcet`.
    #[default]
    Wcet,
    /// Every job draws an integer uniformly from `[bcet, wcet]`.
    Random,
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// One periodic real-time task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task name within a task set.
    pub name: String,

    /// Worst-case execution time of one job.
    pub wcet: Time,

    /// Best-case execution time.  `None` means "same as `wcet`".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcet: Option<Time>,

    /// Interval between consecutive releases.
    pub period: Time,

    /// Relative deadline.
    pub deadline: Time,

    /// Maximum release jitter.
    #[serde(default)]
    pub jitter: Time,
}

impl Task {
    /// Constructs a task with `bcet == wcet` and no jitter.
    pub fn new(name: impl Into<String>, wcet: Time, period: Time, deadline: Time) -> Self {
        Self {
            name: name.into(),
            wcet,
            bcet: None,
            period,
            deadline,
            jitter: 0,
        }
    }

    /// Constructs a task with an implicit deadline (equal to its period).
    pub fn implicit(name: impl Into<String>, wcet: Time, period: Time) -> Self {
        Self::new(name, wcet, period, period)
    }

    /// Returns the task with best-case execution time `bcet`.
    pub fn with_bcet(self, bcet: Time) -> Self {
        Self {
            bcet: Some(bcet),
            ..self
        }
    }

    /// Returns the task with release jitter `jitter`.
    pub fn with_jitter(self, jitter: Time) -> Self {
        Self { jitter, ..self }
    }

    /// Effective best-case execution time.
    pub fn bcet(&self) -> Time {
        self.bcet.unwrap_or(self.wcet)
    }

    /// `wcet / period`.
    pub fn utilization(&self) -> f64 {
        self.wcet as f64 / self.period as f64
    }

    /// `wcet / deadline`.
    pub fn density(&self) -> f64 {
        self.wcet as f64 / self.deadline as f64
    }

    /// Returns `true` if the deadline equals the period.
    pub fn is_implicit(&self) -> bool {
        self.deadline == self.period
    }

    /// Deadline measured from the latest possible actual release.
    pub fn effective_deadline(&self) -> Time {
        self.deadline.saturating_sub(self.jitter)
    }

    /// Check the model invariants that hold for every consumer.
    ///
    /// `bcet <= wcet` is checked at task-set level (see
    /// [`validate_task_set`]) because it is reported as a configuration
    /// error rather than a task parameter error.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.name.is_empty() {
            return Err(TaskError::EmptyName);
        }
        if self.period == 0 {
            return Err(TaskError::ZeroPeriod {
                task: self.name.clone(),
            });
        }
        if self.deadline == 0 {
            return Err(TaskError::ZeroDeadline {
                task: self.name.clone(),
            });
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the constrained-deadline model the
    /// analyzers rely on: `deadline <= period` and `jitter < deadline`.
    pub fn validate_constrained(&self) -> Result<(), TaskError> {
        self.validate()?;
        if self.deadline > self.period {
            return Err(TaskError::DeadlineExceedsPeriod {
                task: self.name.clone(),
                deadline: self.deadline,
                period: self.period,
            });
        }
        if self.jitter >= self.deadline {
            return Err(TaskError::JitterExceedsDeadline {
                task: self.name.clone(),
                jitter: self.jitter,
                deadline: self.deadline,
            });
        }
        Ok(())
    }
}

// ── Task-set helpers ──────────────────────────────────────────────────────────

/// Which task-model variant a consumer requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineModel {
    /// Any positive deadline (simulator).
    Arbitrary,
    /// `deadline <= period` (analyzers).
    Constrained,
}

/// Validate a whole task list before analysis or simulation.
///
/// # Errors
/// * [`AnalysisError::NoTasks`] for an empty list.
/// * [`AnalysisError::InvalidTaskParameter`] for the first invalid task.
/// * [`AnalysisError::BcetExceedsWcet`] if a task's `bcet > wcet`.
/// * [`AnalysisError::DuplicateTaskName`] if two tasks share a name.
pub fn validate_task_set(tasks: &[Task], model: DeadlineModel) -> Result<(), AnalysisError> {
    if tasks.is_empty() {
        return Err(AnalysisError::NoTasks);
    }

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        match model {
            DeadlineModel::Arbitrary => task.validate()?,
            DeadlineModel::Constrained => task.validate_constrained()?,
        }
        if task.bcet() > task.wcet {
            return Err(AnalysisError::BcetExceedsWcet {
                task: task.name.clone(),
                bcet: task.bcet(),
                wcet: task.wcet,
            });
        }
        if !seen.insert(task.name.as_str()) {
            return Err(AnalysisError::DuplicateTaskName(task.name.clone()));
        }
    }
    Ok(())
}

/// Σ `wcet / period`, as a float for reporting.
pub fn total_utilization(tasks: &[Task]) -> f64 {
    tasks.iter().map(Task::utilization).sum()
}

/// Exact test of `Σ wcet / period > 1`.
///
/// The sum is accumulated as a reduced fraction in `u128`; if that ever
/// overflows the float sum is used instead.  Tasks with a zero period are
/// skipped.
pub fn exceeds_full_utilization(tasks: &[Task]) -> bool {
    let mut num: u128 = 0;
    let mut den: u128 = 1;

    for task in tasks.iter().filter(|t| t.period > 0) {
        let (c, t) = (task.wcet as u128, task.period as u128);
        let next = num
            .checked_mul(t)
            .and_then(|a| c.checked_mul(den).and_then(|b| a.checked_add(b)))
            .zip(den.checked_mul(t));

        match next {
            Some((n, d)) => {
                let g = gcd_u128(n, d).max(1);
                num = n / g;
                den = d / g;
            }
            None => return total_utilization(tasks) > 1.0,
        }
    }
    num > den
}

fn gcd_u128(a: u128, b: u128) -> u128 {
    match (u64::try_from(a), u64::try_from(b)) {
        (Ok(a), Ok(b)) => gcd(a, b) as u128,
        _ => {
            let (mut a, mut b) = (a, b);
            while b != 0 {
                let t = b;
                b = a % b;
                a = t;
            }
            a
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
