//! Analytical schedulability tests.
//!
//! * [`rta`]: response-time analysis for fixed-priority (DM / RM)
//!   scheduling by fixed-point iteration.
//! * [`pdc`]: the EDF processor-demand criterion over a bounded set of
//!   candidate instants.
//! * [`feasibility`]: the Liu & Layland utilization bound, a cheap
//!   sufficient test logged alongside RTA.
//!
//! Every analyzer is a pure function of `&[Task]`; all iteration state is
//! local to the call, so independent task sets can be analysed on separate
//! threads without coordination.
//!
//! Results carry a [`Verdict`] rather than a plain `bool` so that an
//! analysis limitation (non-convergence, a horizon that is too short) is
//! never reported as a proof of schedulability.

pub mod error;
pub mod feasibility;
pub mod pdc;
pub mod rta;

pub use error::{AnalysisError, ErrorKind};

use serde::Serialize;

use crate::task::Time;

/// Outcome of a schedulability test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    /// Every deadline is met in every admissible scenario.
    Schedulable,
    /// Some deadline can be missed.
    Unschedulable,
    /// No violation found, but the analysis could not complete its proof.
    Inconclusive(Limitation),
}

impl Verdict {
    /// `true` only for a proven [`Verdict::Schedulable`].
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Verdict::Schedulable)
    }

    pub fn is_unschedulable(&self) -> bool {
        matches!(self, Verdict::Unschedulable)
    }

    pub fn limitation(&self) -> Option<&Limitation> {
        match self {
            Verdict::Inconclusive(l) => Some(l),
            _ => None,
        }
    }
}

/// Why an analysis or simulation could not reach a definitive answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "limitation")]
pub enum Limitation {
    /// RTA hit its iteration bound before the response time settled.
    NonConvergence {
        task: String,
        iterations: u32,
        last_response: Time,
    },

    /// The checked window stops short of the point needed for an exact
    /// answer.  `required` is `None` when that point could not be computed
    /// (hyperperiod overflow or above the configured limit).
    HorizonTooSmall {
        checked_up_to: Time,
        required: Option<Time>,
    },
}

impl std::fmt::Display for Limitation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limitation::NonConvergence {
                task,
                iterations,
                last_response,
            } => write!(
                f,
                "response time of '{task}' did not converge after {iterations} iterations (last {last_response})"
            ),
            Limitation::HorizonTooSmall {
                checked_up_to,
                required: Some(required),
            } => write!(f, "checked up to {checked_up_to}, exact answer needs {required}"),
            Limitation::HorizonTooSmall {
                checked_up_to,
                required: None,
            } => write!(
                f,
                "checked up to {checked_up_to}, exact horizon is not computable"
            ),
        }
    }
}
