//! Observed per-task statistics of simulation runs.

use std::collections::BTreeMap;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::task::Time;

/// Statistics for one task over one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Jobs released before the horizon.
    pub releases: u64,
    /// Jobs that finished before the horizon.
    pub completed: u64,
    /// Completed jobs that finished after their absolute deadline.
    pub missed: u64,
    /// Jobs still unfinished at the horizon (dropped, not counted as missed).
    pub pending_at_horizon: u64,
    pub sum_response: u64,
    pub max_response: Time,
    pub min_response: Option<Time>,
}

impl TaskStats {
    pub fn record_release(&mut self) {
        self.releases += 1;
    }

    pub fn record_completion(&mut self, response: Time, missed: bool) {
        self.completed += 1;
        self.sum_response = self.sum_response.saturating_add(response);
        self.max_response = self.max_response.max(response);
        self.min_response = Some(self.min_response.map_or(response, |m| m.min(response)));
        if missed {
            self.missed += 1;
        }
    }

    pub fn record_pending(&mut self) {
        self.pending_at_horizon += 1;
    }

    /// Mean response time of completed jobs; `0.0` if none completed.
    pub fn avg_response(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        self.sum_response as f64 / self.completed as f64
    }
}

impl Serialize for TaskStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TaskStats", 7)?;
        s.serialize_field("releases", &self.releases)?;
        s.serialize_field("completed", &self.completed)?;
        s.serialize_field("missed", &self.missed)?;
        s.serialize_field("pending_at_horizon", &self.pending_at_horizon)?;
        s.serialize_field("avg_response", &self.avg_response())?;
        s.serialize_field("max_response", &self.max_response)?;
        s.serialize_field("min_response", &self.min_response)?;
        s.end()
    }
}

/// One task's statistics across several runs with different seeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub runs: usize,
    /// Maximum of the per-run maxima.
    pub max_response: Time,
    /// Mean of the per-run averages.
    pub average_response: f64,
    /// Minimum of the per-run minima.
    pub min_response: Option<Time>,
    /// Misses summed over all runs.
    pub missed: u64,
    /// Releases summed over all runs.
    pub releases: u64,
}

impl AggregatedStats {
    fn absorb(&mut self, run: &TaskStats) {
        self.runs += 1;
        self.max_response = self.max_response.max(run.max_response);
        self.min_response = match (self.min_response, run.min_response) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.missed += run.missed;
        self.releases += run.releases;
        // running mean of the per-run averages
        self.average_response += (run.avg_response() - self.average_response) / self.runs as f64;
    }
}

/// Fold per-run statistics into per-task aggregates.
pub fn aggregate<'a>(
    runs: impl IntoIterator<Item = &'a BTreeMap<String, TaskStats>>,
) -> BTreeMap<String, AggregatedStats> {
    let mut out: BTreeMap<String, AggregatedStats> = BTreeMap::new();
    for run in runs {
        for (name, stats) in run {
            out.entry(name.clone()).or_default().absorb(stats);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_updates_average_max_and_min() {
        let mut s = TaskStats::default();
        s.record_completion(4, false);
        s.record_completion(8, true);
        assert_eq!(s.completed, 2);
        assert_eq!(s.missed, 1);
        assert_eq!(s.max_response, 8);
        assert_eq!(s.min_response, Some(4));
        assert_eq!(s.sum_response, 12);
        assert!((s.avg_response() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn empty_stats_report_zero() {
        let s = TaskStats::default();
        assert_eq!(s.avg_response(), 0.0);
        assert_eq!(s.max_response, 0);
        assert_eq!(s.min_response, None);
    }

    #[test]
    fn aggregate_combines_runs() {
        let mut a = TaskStats::default();
        a.record_release();
        a.record_completion(2, false);
        let mut b = TaskStats::default();
        b.record_release();
        b.record_release();
        b.record_completion(6, true);

        let run1 = BTreeMap::from([("t".to_string(), a)]);
        let run2 = BTreeMap::from([("t".to_string(), b)]);
        let agg = aggregate([&run1, &run2]);
        let t = &agg["t"];

        assert_eq!(t.runs, 2);
        assert_eq!(t.max_response, 6);
        assert_eq!(t.min_response, Some(2));
        assert_eq!(t.missed, 1);
        assert_eq!(t.releases, 3);
        assert!((t.average_response - 4.0).abs() < 1e-12);
    }
}
