/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! schedcheck – uniprocessor schedulability analysis and simulation
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task          – task model, policies, validation
//! ├── hyperperiod/  – LCM / GCD helpers, hyperperiod limit
//! ├── analysis/     – verdicts, errors, RTA (DM/RM), EDF processor demand
//! ├── simulator/    – event-driven DM / RM / EDF simulator
//! ├── taskset       – YAML task-set files
//! ├── config/       – YAML analysis configuration
//! └── report        – per-set evaluation, cross-check, batch runs
//! ```

pub mod analysis;
pub mod config;
pub mod hyperperiod;
pub mod report;
pub mod simulator;
pub mod task;
pub mod taskset;
