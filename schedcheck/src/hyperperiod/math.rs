/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD and checked LCM.
//!
//! Free functions so they can be used by the task model's exact utilization
//! test and by the analyzers without going through
//! [`HyperperiodCalculator`](super::HyperperiodCalculator).

use super::HyperperiodError;

/// Iterative Euclidean GCD.  `gcd(0, x) == x`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Checked LCM: `Err(HyperperiodError::Overflow { a, b })` if the result
/// does not fit in `u64`.
///
/// Divides before multiplying, `(a / gcd(a, b)) * b`, and checks the final
/// multiplication.  Returns `Ok(0)` when either input is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }

    let reduced = a / gcd(a, b);

    reduced
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// Reduce a slice of periods to their overall LCM.
///
/// `Ok(0)` for an empty slice; `Err` on the first overflow.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    periods
        .iter()
        .try_fold(periods.first().copied().unwrap_or(0), |acc, &p| lcm(acc, p))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
