//! Event-driven uniprocessor scheduling simulator.
//!
//! Time advances from event to event (release, completion, horizon) rather
//! than tick by tick.  At each event:
//!
//! 1. every task whose next release equals `now` releases one job;
//! 2. an idle processor dispatches the best ready job, or jumps to the next
//!    release if nothing is ready;
//! 3. a ready job with a strictly better [`PriorityKey`] preempts the
//!    running one (zero-cost preemption);
//! 4. time advances to `min(completion, next release, horizon)`.
//!
//! Jobs still unfinished at the horizon are dropped and counted in
//! [`TaskStats::pending_at_horizon`], never as misses.
//!
//! Each run owns its own [`StdRng`] seeded from [`SimulationConfig::seed`],
//! so identical inputs reproduce identical schedules and concurrent runs
//! never share generator state.

pub mod job;
pub mod stats;

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{AnalysisError, Limitation};
use crate::hyperperiod::HyperperiodCalculator;
use crate::task::{validate_task_set, DeadlineModel, ExecutionMode, Policy, Task, Time};

pub use job::{Job, PriorityKey, QueuedJob};
pub use stats::{AggregatedStats, TaskStats};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Horizon simulated when no hyperperiod is available.
pub const DEFAULT_FALLBACK_HORIZON: Time = 100_000;

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationConfig {
    pub policy: Policy,
    /// Simulated time span `[0, horizon)`.  Must be positive.
    pub horizon: Time,
    pub mode: ExecutionMode,
    pub seed: u64,
}

impl SimulationConfig {
    pub fn new(policy: Policy, horizon: Time) -> Self {
        Self {
            policy,
            horizon,
            mode: ExecutionMode::Wcet,
            seed: 0,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Horizon used when none is configured: one hyperperiod, or
    /// `fallback` when the hyperperiod exceeds the calculator's limit or
    /// overflows.
    pub fn derived_horizon(tasks: &[Task], calculator: &HyperperiodCalculator, fallback: Time) -> Time {
        match calculator.calculate(tasks) {
            Ok(info) => info.hyperperiod,
            Err(e) => {
                debug!(error = %e, fallback, "No usable hyperperiod, using fallback horizon");
                fallback
            }
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Observed behaviour of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub policy: Policy,
    pub horizon: Time,
    pub mode: ExecutionMode,
    pub seed: u64,
    pub per_task: BTreeMap<String, TaskStats>,
    /// Set when the horizon does not cover a full hyperperiod.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Limitation>,
}

impl SimulationResult {
    pub fn total_missed(&self) -> u64 {
        self.per_task.values().map(|s| s.missed).sum()
    }

    pub fn total_releases(&self) -> u64 {
        self.per_task.values().map(|s| s.releases).sum()
    }

    pub fn stats_of(&self, name: &str) -> Option<&TaskStats> {
        self.per_task.get(name)
    }
}

/// Several runs of one configuration with consecutive seeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiRunResult {
    pub policy: Policy,
    pub horizon: Time,
    pub mode: ExecutionMode,
    pub seeds: Vec<u64>,
    pub per_task: BTreeMap<String, AggregatedStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Limitation>,
}

impl MultiRunResult {
    pub fn total_missed(&self) -> u64 {
        self.per_task.values().map(|s| s.missed).sum()
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Simulate `tasks` under `config`, tagging coverage against the default
/// hyperperiod limit.
pub fn simulate(tasks: &[Task], config: &SimulationConfig) -> Result<SimulationResult, AnalysisError> {
    simulate_with(tasks, config, &HyperperiodCalculator::new())
}

/// Simulate `tasks` under `config`.
///
/// Deadlines may exceed periods here; the simulator only needs each task to
/// be individually valid with `bcet ≤ wcet` and unique names.
///
/// # Errors
/// * Any [`validate_task_set`] error.
/// * [`AnalysisError::ZeroHorizon`] if `config.horizon == 0`.
pub fn simulate_with(
    tasks: &[Task],
    config: &SimulationConfig,
    calculator: &HyperperiodCalculator,
) -> Result<SimulationResult, AnalysisError> {
    validate_task_set(tasks, DeadlineModel::Arbitrary)?;
    if config.horizon == 0 {
        return Err(AnalysisError::ZeroHorizon);
    }

    let coverage = coverage(tasks, config.horizon, calculator);
    if let Some(limitation) = &coverage {
        debug!(%limitation, "Simulation horizon shorter than one hyperperiod");
    }

    let stats = Engine::new(tasks, config).run();
    let per_task = tasks
        .iter()
        .zip(stats)
        .map(|(t, s)| (t.name.clone(), s))
        .collect();

    let result = SimulationResult {
        policy: config.policy,
        horizon: config.horizon,
        mode: config.mode,
        seed: config.seed,
        per_task,
        coverage,
    };

    info!(
        policy = %config.policy,
        horizon = config.horizon,
        mode = ?config.mode,
        seed = config.seed,
        releases = result.total_releases(),
        missed = result.total_missed(),
        "Simulation finished"
    );

    Ok(result)
}

/// Run `config` with seeds `seed, seed + 1, …` and aggregate per task.
///
/// # Errors
/// As [`simulate_with`], plus [`AnalysisError::ZeroRuns`] if `runs == 0`.
pub fn simulate_runs(
    tasks: &[Task],
    config: &SimulationConfig,
    runs: usize,
) -> Result<MultiRunResult, AnalysisError> {
    simulate_runs_with(tasks, config, runs, &HyperperiodCalculator::new())
}

pub fn simulate_runs_with(
    tasks: &[Task],
    config: &SimulationConfig,
    runs: usize,
    calculator: &HyperperiodCalculator,
) -> Result<MultiRunResult, AnalysisError> {
    if runs == 0 {
        return Err(AnalysisError::ZeroRuns);
    }

    let seeds: Vec<u64> = (0..runs as u64).map(|i| config.seed.wrapping_add(i)).collect();
    let results = seeds
        .iter()
        .map(|&seed| simulate_with(tasks, &config.with_seed(seed), calculator))
        .collect::<Result<Vec<_>, _>>()?;

    let per_task = stats::aggregate(results.iter().map(|r| &r.per_task));
    let coverage = results.first().and_then(|r| r.coverage.clone());

    Ok(MultiRunResult {
        policy: config.policy,
        horizon: config.horizon,
        mode: config.mode,
        seeds,
        per_task,
        coverage,
    })
}

/// `HorizonTooSmall` unless `horizon` reaches the hyperperiod.
pub fn coverage(tasks: &[Task], horizon: Time, calculator: &HyperperiodCalculator) -> Option<Limitation> {
    match calculator.calculate(tasks) {
        Ok(info) if horizon >= info.hyperperiod => None,
        Ok(info) => Some(Limitation::HorizonTooSmall {
            checked_up_to: horizon,
            required: Some(info.hyperperiod),
        }),
        Err(_) => Some(Limitation::HorizonTooSmall {
            checked_up_to: horizon,
            required: None,
        }),
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Mutable state of one run.  Owns every live job.
struct Engine<'t> {
    tasks: &'t [Task],
    policy: Policy,
    mode: ExecutionMode,
    horizon: Time,
    rng: StdRng,
    /// Position of each task in name order, used in priority keys.
    name_rank: Vec<usize>,
    next_release: Vec<Time>,
    sequence: Vec<u64>,
    ready: BinaryHeap<Reverse<QueuedJob<'t>>>,
    current: Option<QueuedJob<'t>>,
    stats: Vec<TaskStats>,
    now: Time,
}

impl<'t> Engine<'t> {
    fn new(tasks: &'t [Task], config: &SimulationConfig) -> Self {
        let mut by_name: Vec<usize> = (0..tasks.len()).collect();
        by_name.sort_by(|&a, &b| tasks[a].name.cmp(&tasks[b].name));
        let mut name_rank = vec![0; tasks.len()];
        for (rank, &idx) in by_name.iter().enumerate() {
            name_rank[idx] = rank;
        }

        Self {
            tasks,
            policy: config.policy,
            mode: config.mode,
            horizon: config.horizon,
            rng: StdRng::seed_from_u64(config.seed),
            name_rank,
            next_release: vec![0; tasks.len()],
            sequence: vec![0; tasks.len()],
            ready: BinaryHeap::new(),
            current: None,
            stats: vec![TaskStats::default(); tasks.len()],
            now: 0,
        }
    }

    fn run(mut self) -> Vec<TaskStats> {
        while self.now < self.horizon {
            self.release();

            if self.current.is_none() {
                match self.ready.pop() {
                    Some(Reverse(next)) => self.dispatch(next),
                    None => {
                        let next = self.next_release_instant();
                        if next >= self.horizon {
                            break;
                        }
                        self.now = next;
                        continue;
                    }
                }
            }

            self.preempt_if_better();
            self.advance();
        }

        self.drop_pending();
        self.stats
    }

    fn release(&mut self) {
        let tasks = self.tasks;
        for (i, task) in tasks.iter().enumerate() {
            if self.next_release[i] != self.now {
                continue;
            }
            self.sequence[i] += 1;
            let execution = self.draw_execution(task);
            let job = Job::new(task, i, self.sequence[i], self.now, execution);
            let key = PriorityKey::new(self.policy, &job, self.name_rank[i]);
            self.ready.push(Reverse(QueuedJob { key, job }));
            self.stats[i].record_release();
            self.next_release[i] = self.now.saturating_add(task.period);
        }
    }

    fn draw_execution(&mut self, task: &Task) -> Time {
        match self.mode {
            ExecutionMode::Wcet => task.wcet,
            ExecutionMode::Random => self.rng.gen_range(task.bcet()..=task.wcet),
        }
    }

    fn dispatch(&mut self, mut next: QueuedJob<'t>) {
        next.job.dispatch(self.now);
        self.current = Some(next);
    }

    fn preempt_if_better(&mut self) {
        let better = match (&self.current, self.ready.peek()) {
            (Some(running), Some(Reverse(best))) => best.key < running.key,
            _ => false,
        };
        if !better {
            return;
        }
        if let Some(Reverse(mut next)) = self.ready.pop() {
            next.job.dispatch(self.now);
            if let Some(preempted) = self.current.replace(next) {
                self.ready.push(Reverse(preempted));
            }
        }
    }

    fn advance(&mut self) {
        let next_release = self.next_release_instant();
        let Some(running) = self.current.as_mut() else {
            return;
        };

        let finish = self.now.saturating_add(running.job.remaining);
        let next = finish.min(next_release).min(self.horizon);
        running.job.run(next - self.now);
        self.now = next;

        if running.job.is_complete() {
            if let Some(done) = self.current.take() {
                self.complete(done.job);
            }
        }
    }

    fn complete(&mut self, mut job: Job<'t>) {
        let response = job.complete(self.now);
        let missed = job.missed();
        if missed {
            debug!(
                task = %job.task.name,
                sequence = job.sequence,
                completion = self.now,
                deadline = job.absolute_deadline,
                "Deadline miss"
            );
        }
        self.stats[job.task_index].record_completion(response, missed);
    }

    fn drop_pending(&mut self) {
        let pending = self
            .current
            .take()
            .into_iter()
            .chain(self.ready.drain().map(|Reverse(q)| q));
        for queued in pending {
            self.stats[queued.job.task_index].record_pending();
        }
    }

    fn next_release_instant(&self) -> Time {
        self.next_release.iter().copied().min().unwrap_or(Time::MAX)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_task_example() -> Vec<Task> {
        vec![Task::implicit("A", 1, 4), Task::implicit("B", 2, 6)]
    }

    fn dm(horizon: Time) -> SimulationConfig {
        SimulationConfig::new(Policy::Dm, horizon)
    }

    // ── Schedules ─────────────────────────────────────────────────────────────

    #[test]
    fn two_task_example_over_one_hyperperiod() {
        let r = simulate(&two_task_example(), &dm(12)).unwrap();

        let a = r.stats_of("A").unwrap();
        assert_eq!(a.releases, 3);
        assert_eq!(a.completed, 3);
        assert_eq!(a.max_response, 1);

        // B: 1..3 in the first period, 6..8 in the second
        let b = r.stats_of("B").unwrap();
        assert_eq!(b.releases, 2);
        assert_eq!(b.max_response, 3);
        assert_eq!(b.min_response, Some(2));
        assert!((b.avg_response() - 2.5).abs() < 1e-12);

        assert_eq!(r.total_missed(), 0);
        assert_eq!(r.coverage, None);
    }

    #[test]
    fn higher_priority_release_preempts() {
        let tasks = vec![Task::implicit("H", 1, 4), Task::implicit("L", 6, 20)];
        let r = simulate(&tasks, &dm(20)).unwrap();

        // L runs 1..4 and 5..8
        let l = r.stats_of("L").unwrap();
        assert_eq!(l.completed, 1);
        assert_eq!(l.max_response, 8);

        let h = r.stats_of("H").unwrap();
        assert_eq!(h.releases, 5);
        assert_eq!(h.max_response, 1);
    }

    #[test]
    fn edf_meets_deadlines_that_dm_misses() {
        let tasks = vec![Task::implicit("t1", 2, 5), Task::implicit("t2", 4, 7)];

        let dm_run = simulate(&tasks, &dm(35)).unwrap();
        assert!(dm_run.stats_of("t2").unwrap().missed > 0);

        let edf_run = simulate(&tasks, &SimulationConfig::new(Policy::Edf, 35)).unwrap();
        assert_eq!(edf_run.total_missed(), 0);
        assert_eq!(edf_run.stats_of("t2").unwrap().max_response, 6);
    }

    #[test]
    fn rate_monotonic_orders_by_period() {
        // DM prefers "a" (deadline 3), RM prefers "b" (period 5)
        let tasks = vec![Task::new("a", 1, 10, 3), Task::implicit("b", 2, 5)];

        let dm_run = simulate(&tasks, &dm(10)).unwrap();
        assert_eq!(dm_run.stats_of("a").unwrap().max_response, 1);

        let rm_run = simulate(&tasks, &SimulationConfig::new(Policy::Rm, 10)).unwrap();
        assert_eq!(rm_run.stats_of("a").unwrap().max_response, 3);
        assert_eq!(rm_run.stats_of("a").unwrap().missed, 0);
    }

    #[test]
    fn zero_wcet_job_completes_on_release() {
        let tasks = vec![Task::implicit("z", 0, 5)];
        let r = simulate(&tasks, &dm(10)).unwrap();
        let z = r.stats_of("z").unwrap();
        assert_eq!(z.completed, 2);
        assert_eq!(z.max_response, 0);
    }

    #[test]
    fn deadline_beyond_period_is_simulated() {
        let tasks = vec![Task::new("a", 3, 4, 6)];
        let r = simulate(&tasks, &dm(12)).unwrap();
        assert_eq!(r.stats_of("a").unwrap().releases, 3);
        assert_eq!(r.total_missed(), 0);
    }

    // ── Horizon ───────────────────────────────────────────────────────────────

    #[test]
    fn unfinished_job_at_horizon_is_dropped() {
        let tasks = vec![Task::implicit("a", 5, 10)];
        let r = simulate(&tasks, &dm(3)).unwrap();
        let a = r.stats_of("a").unwrap();
        assert_eq!(a.releases, 1);
        assert_eq!(a.completed, 0);
        assert_eq!(a.pending_at_horizon, 1);
        assert_eq!(a.missed, 0);
        assert_eq!(
            r.coverage,
            Some(Limitation::HorizonTooSmall {
                checked_up_to: 3,
                required: Some(10)
            })
        );
    }

    #[test]
    fn uncomputable_hyperperiod_is_tagged() {
        let calc = HyperperiodCalculator::with_limit(10);
        let tasks = vec![Task::implicit("a", 1, 7), Task::implicit("b", 1, 11)];
        let r = simulate_with(&tasks, &dm(100), &calc).unwrap();
        assert_eq!(
            r.coverage,
            Some(Limitation::HorizonTooSmall {
                checked_up_to: 100,
                required: None
            })
        );
    }

    #[test]
    fn derived_horizon_is_hyperperiod_or_fallback() {
        let tasks = two_task_example();
        assert_eq!(SimulationConfig::derived_horizon(&tasks, &HyperperiodCalculator::new(), 500), 12);
        assert_eq!(
            SimulationConfig::derived_horizon(&tasks, &HyperperiodCalculator::with_limit(10), 500),
            500
        );
    }

    // ── Sampling ──────────────────────────────────────────────────────────────

    #[test]
    fn random_mode_is_reproducible_per_seed() {
        let tasks = vec![
            Task::implicit("a", 4, 10).with_bcet(1),
            Task::implicit("b", 6, 15).with_bcet(2),
        ];
        let config = dm(300).with_mode(ExecutionMode::Random).with_seed(42);
        assert_eq!(simulate(&tasks, &config).unwrap(), simulate(&tasks, &config).unwrap());
    }

    #[test]
    fn random_mode_stays_within_bounds() {
        let tasks = vec![Task::implicit("a", 5, 10).with_bcet(1)];
        let config = dm(1_000).with_mode(ExecutionMode::Random).with_seed(7);
        let a = simulate(&tasks, &config).unwrap().per_task["a"].clone();
        assert_eq!(a.completed, 100);
        assert!(a.min_response.unwrap() >= 1);
        assert!(a.max_response <= 5);
    }

    #[test]
    fn multiple_runs_aggregate_consecutive_seeds() {
        let tasks = vec![Task::implicit("a", 3, 10).with_bcet(1)];
        let config = dm(100).with_mode(ExecutionMode::Random).with_seed(5);
        let multi = simulate_runs(&tasks, &config, 3).unwrap();

        assert_eq!(multi.seeds, vec![5, 6, 7]);
        let a = &multi.per_task["a"];
        assert_eq!(a.runs, 3);
        assert_eq!(a.releases, 30);
        assert!(a.max_response <= 3);
        assert_eq!(multi.total_missed(), 0);
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn bcet_above_wcet_is_rejected_before_simulation() {
        let tasks = vec![Task::implicit("a", 2, 10).with_bcet(3)];
        let err = simulate(&tasks, &dm(10)).unwrap_err();
        assert!(matches!(err, AnalysisError::BcetExceedsWcet { .. }));
    }

    #[test]
    fn empty_task_list_is_rejected() {
        assert_eq!(simulate(&[], &dm(10)).unwrap_err(), AnalysisError::NoTasks);
    }

    #[test]
    fn zero_horizon_and_zero_runs_are_rejected() {
        let tasks = two_task_example();
        assert_eq!(simulate(&tasks, &dm(0)).unwrap_err(), AnalysisError::ZeroHorizon);
        assert_eq!(simulate_runs(&tasks, &dm(10), 0).unwrap_err(), AnalysisError::ZeroRuns);
    }
}
