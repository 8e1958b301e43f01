//! One released instance of a task, owned exclusively by the simulator.

use std::cmp::Ordering;

use crate::task::{Policy, Task, Time};

/// A job from release to completion.
///
/// Created by the release step, mutated only by [`run`](Job::run) and
/// [`complete`](Job::complete), and dropped once its statistics have been
/// recorded.
#[derive(Debug, Clone)]
pub struct Job<'t> {
    pub task: &'t Task,
    /// Index of `task` in the simulated task slice.
    pub task_index: usize,
    /// 1-based release counter of the owning task.
    pub sequence: u64,
    pub release: Time,
    pub absolute_deadline: Time,
    /// Execution time still owed.  Zero means the job is finished.
    pub remaining: Time,
    /// First dispatch instant.
    pub start: Option<Time>,
    pub completion: Option<Time>,
}

impl<'t> Job<'t> {
    pub fn new(
        task: &'t Task,
        task_index: usize,
        sequence: u64,
        release: Time,
        execution: Time,
    ) -> Self {
        Self {
            task,
            task_index,
            sequence,
            release,
            absolute_deadline: release.saturating_add(task.deadline),
            remaining: execution,
            start: None,
            completion: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Record the first dispatch; later dispatches after a preemption keep
    /// the original start.
    pub fn dispatch(&mut self, now: Time) {
        self.start.get_or_insert(now);
    }

    /// Execute for `elapsed` time units.
    pub fn run(&mut self, elapsed: Time) {
        debug_assert!(elapsed <= self.remaining, "job ran past its demand");
        self.remaining = self.remaining.saturating_sub(elapsed);
    }

    /// Mark the job finished at `now` and return its response time.
    pub fn complete(&mut self, now: Time) -> Time {
        self.completion = Some(now);
        now - self.release
    }

    pub fn response_time(&self) -> Option<Time> {
        self.completion.map(|c| c - self.release)
    }

    /// `true` once completed strictly after the absolute deadline.
    pub fn missed(&self) -> bool {
        self.completion
            .is_some_and(|c| c > self.absolute_deadline)
    }
}

// ── Priority keys ─────────────────────────────────────────────────────────────

/// Lexicographic dispatch priority; the smaller key runs first.
///
/// * DM:  `(deadline, period, name, sequence)`
/// * RM:  `(period, deadline, name, sequence)`
/// * EDF: `(absolute deadline, deadline, name, sequence)`
///
/// `name` is represented by the task's rank in name order, which compares
/// the same way as the names themselves since names are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey(Time, Time, usize, u64);

impl PriorityKey {
    pub fn new(policy: Policy, job: &Job<'_>, name_rank: usize) -> Self {
        let task = job.task;
        match policy {
            Policy::Dm => Self(task.deadline, task.period, name_rank, job.sequence),
            Policy::Rm => Self(task.period, task.deadline, name_rank, job.sequence),
            Policy::Edf => Self(job.absolute_deadline, task.deadline, name_rank, job.sequence),
        }
    }
}

/// A job together with the key it was queued under.
#[derive(Debug, Clone)]
pub struct QueuedJob<'t> {
    pub key: PriorityKey,
    pub job: Job<'t>,
}

impl PartialEq for QueuedJob<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueuedJob<'_> {}

impl PartialOrd for QueuedJob<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
