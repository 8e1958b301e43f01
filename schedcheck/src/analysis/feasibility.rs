/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Utilization-bound feasibility test for fixed-priority scheduling.
//!
//! The bound is **sufficient, not necessary**: passing it proves the task set
//! schedulable under DM/RM, failing it proves nothing.  Response-time
//! analysis always runs regardless; the bound is computed and logged next to
//! it so a reader can see how much slack the cheap test leaves.
//!
//! # Theory
//! **Liu & Layland (1973)**: `n` independent periodic tasks with implicit
//! deadlines are schedulable under Rate Monotonic on one CPU if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! For constrained deadlines the same bound applied to the total *density*
//! `Σ C_i / D_i` is sufficient under Deadline Monotonic, which is what
//! [`check_liu_layland`] uses (density equals utilization when `D = T`).
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | 3 | 0.780 |
//! | ∞ | ln(2) ≈ 0.693 |

use crate::task::Task;

/// Liu & Layland bound `n × (2^(1/n) − 1)`; `0.0` for `n = 0`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Returns `None` if the task set is provably fixed-priority schedulable by
/// the density bound, `Some(total_density)` if the bound is exceeded.
///
/// Tasks with a zero deadline contribute nothing.
pub fn check_liu_layland(tasks: &[Task]) -> Option<f64> {
    let counted: Vec<&Task> = tasks.iter().filter(|t| t.deadline > 0).collect();

    if counted.is_empty() {
        return None;
    }

    let total: f64 = counted.iter().map(|t| t.density()).sum();
    let bound = liu_layland_bound(counted.len());

    if total > bound {
        Some(total)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
