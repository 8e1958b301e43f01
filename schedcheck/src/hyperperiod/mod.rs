//! Hyperperiod calculation.
//!
//! The hyperperiod of a set of periodic tasks is the least common multiple
//! of their periods: the smallest window after which a synchronous release
//! pattern repeats.  It bounds the EDF processor-demand check and sizes the
//! default simulation horizon.
//!
//! Each failure is a distinct [`HyperperiodError`] variant so callers can
//! tell "no tasks" from "overflow" from "larger than we are willing to
//! enumerate"; the analyzers turn the last two into a `HorizonTooSmall`
//! limitation instead of guessing.

pub mod math;

use tracing::debug;

use crate::task::{Task, Time};
use math::lcm_of_slice;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on a hyperperiod worth enumerating.
///
/// Callers that want a different limit use
/// [`HyperperiodCalculator::with_limit`].
pub const DEFAULT_HYPERPERIOD_LIMIT: Time = 3_600_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The task slice was empty (or every period was zero).
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: Time, limit: Time },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no tasks with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "hyperperiod {value} exceeds limit {limit}")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod of one task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    /// LCM of all unique task periods.
    pub hyperperiod: Time,

    /// Unique periods present in the task set (sorted, deduplicated).
    pub unique_periods: Vec<Time>,

    /// Number of tasks that contributed.
    pub task_count: usize,
}

// ── HyperperiodCalculator ─────────────────────────────────────────────────────

/// Computes task-set hyperperiods subject to an upper limit.
///
/// # Example
/// ```rust
/// use schedcheck::hyperperiod::HyperperiodCalculator;
/// use schedcheck::task::Task;
///
/// let tasks = vec![Task::implicit("a", 1, 4), Task::implicit("b", 2, 6)];
/// let info = HyperperiodCalculator::new().calculate(&tasks).unwrap();
/// assert_eq!(info.hyperperiod, 12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HyperperiodCalculator {
    limit: Time,
}

impl HyperperiodCalculator {
    /// Calculator with [`DEFAULT_HYPERPERIOD_LIMIT`].
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_HYPERPERIOD_LIMIT,
        }
    }

    /// Calculator with a custom limit.
    pub fn with_limit(limit: Time) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> Time {
        self.limit
    }

    /// Calculate the hyperperiod of `tasks`.
    ///
    /// # Errors
    /// * [`HyperperiodError::NoValidPeriods`] – no task has a non-zero period.
    /// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
    /// * [`HyperperiodError::TooLarge`] – result exceeds the limit.
    pub fn calculate(&self, tasks: &[Task]) -> Result<HyperperiodInfo, HyperperiodError> {
        let mut unique_periods: Vec<Time> = tasks
            .iter()
            .map(|t| t.period)
            .filter(|&p| p > 0)
            .collect();
        let task_count = unique_periods.len();

        if unique_periods.is_empty() {
            return Err(HyperperiodError::NoValidPeriods);
        }

        unique_periods.sort_unstable();
        unique_periods.dedup();

        let hyperperiod = lcm_of_slice(&unique_periods).inspect_err(|e| {
            debug!(error = %e, "Hyperperiod is not representable");
        })?;

        if hyperperiod > self.limit {
            debug!(
                hyperperiod,
                limit = self.limit,
                "Hyperperiod exceeds configured limit"
            );
            return Err(HyperperiodError::TooLarge {
                value: hyperperiod,
                limit: self.limit,
            });
        }

        debug!(
            hyperperiod,
            task_count,
            unique_count = unique_periods.len(),
            "Calculated hyperperiod"
        );

        Ok(HyperperiodInfo {
            hyperperiod,
            unique_periods,
            task_count,
        })
    }
}

impl Default for HyperperiodCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
