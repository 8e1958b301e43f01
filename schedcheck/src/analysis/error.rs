/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the analyzers and the simulator.
//!
//! Only failures that stop an analysis from starting are errors.  Outcomes
//! that limit how much an otherwise valid analysis can prove (RTA
//! non-convergence, a PDC or simulation horizon that is too short) are
//! [`Limitation`](super::Limitation) tags inside the result records.

use serde::Serialize;
use thiserror::Error;

use crate::task::{TaskError, Time};

/// Error category, one per failure kind a caller may want to dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A single task violates the task-model invariants.
    InvalidTaskParameter,
    /// The task list or analysis parameters as a whole are unusable.
    ConfigurationError,
}

/// Top-level error returned by every analysis and simulation entry point.
///
/// | Variant | Kind |
/// |---|---|
/// | `InvalidTaskParameter` | `InvalidTaskParameter` |
/// | `NoTasks` / `DuplicateTaskName` / `BcetExceedsWcet` | `ConfigurationError` |
/// | `ZeroIterationBound` / `ZeroHorizon` / `ZeroRuns` | `ConfigurationError` |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("invalid task parameter: {0}")]
    InvalidTaskParameter(#[from] TaskError),

    #[error("no tasks provided: task list is empty")]
    NoTasks,

    #[error("duplicate task name '{0}': task names must be unique")]
    DuplicateTaskName(String),

    #[error("task '{task}' has bcet {bcet} greater than wcet {wcet}")]
    BcetExceedsWcet { task: String, bcet: Time, wcet: Time },

    /// `RtaConfig::max_iterations` was zero.
    #[error("response-time analysis needs an iteration bound of at least 1")]
    ZeroIterationBound,

    /// The simulation horizon was zero.
    #[error("simulation horizon must be positive")]
    ZeroHorizon,

    /// A multi-run simulation was asked for zero runs.
    #[error("simulation run count must be at least 1")]
    ZeroRuns,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidTaskParameter(_) => ErrorKind::InvalidTaskParameter,
            AnalysisError::NoTasks
            | AnalysisError::DuplicateTaskName(_)
            | AnalysisError::BcetExceedsWcet { .. }
            | AnalysisError::ZeroIterationBound
            | AnalysisError::ZeroHorizon
            | AnalysisError::ZeroRuns => ErrorKind::ConfigurationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_errors_are_invalid_parameters() {
        let err = AnalysisError::from(TaskError::ZeroPeriod { task: "a".into() });
        assert_eq!(err.kind(), ErrorKind::InvalidTaskParameter);
        assert_eq!(
            err.to_string(),
            "invalid task parameter: task 'a': period must be positive"
        );
    }

    #[test]
    fn set_level_errors_are_configuration_errors() {
        assert_eq!(AnalysisError::NoTasks.kind(), ErrorKind::ConfigurationError);
        assert_eq!(
            AnalysisError::BcetExceedsWcet {
                task: "a".into(),
                bcet: 4,
                wcet: 2
            }
            .kind(),
            ErrorKind::ConfigurationError
        );
    }
}
