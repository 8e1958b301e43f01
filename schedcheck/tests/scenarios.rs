//! End-to-end scenarios: task-set files through analysis, simulation and
//! reporting.

use std::fs;

use tempfile::tempdir;

use schedcheck::analysis::pdc::analyze_edf;
use schedcheck::analysis::rta::{analyze_dm, ResponseOutcome, RtaConfig};
use schedcheck::analysis::{Limitation, Verdict};
use schedcheck::config::AnalysisConfig;
use schedcheck::report::{evaluate, evaluate_batch, CrossCheck, Outcome, SimulationRecord};
use schedcheck::simulator::{simulate, SimulationConfig};
use schedcheck::task::{Policy, Task};
use schedcheck::taskset::{collect_task_set_files, load_task_set, TaskSet};

// ── Worked examples ──────────────────────────────────────────────────────────

#[test]
fn two_task_example_is_schedulable_under_dm_and_edf() {
    let tasks = vec![Task::implicit("A", 1, 4), Task::implicit("B", 2, 6)];

    let dm = analyze_dm(&tasks, &RtaConfig::default()).unwrap();
    assert_eq!(dm.order, vec!["A", "B"]);
    assert_eq!(dm.wcrt_of("A"), Some(1));
    assert_eq!(dm.wcrt_of("B"), Some(3));
    assert_eq!(dm.verdict, Verdict::Schedulable);

    let edf = analyze_edf(&tasks, 24).unwrap();
    assert_eq!(edf.candidate_points, 8);
    assert_eq!(edf.checked_points, 8);
    assert_eq!(edf.violation, None);
    assert_eq!(edf.verdict, Verdict::Schedulable);
}

#[test]
fn overload_is_rejected_without_iteration() {
    let tasks: Vec<Task> = ["a", "b", "c"]
        .iter()
        .map(|n| Task::implicit(*n, 5, 10))
        .collect();

    let dm = analyze_dm(&tasks, &RtaConfig::default()).unwrap();
    assert!(dm.overloaded);
    assert!(dm.responses.is_empty());
    assert_eq!(dm.verdict, Verdict::Unschedulable);

    let edf = analyze_edf(&tasks, 1_000).unwrap();
    assert!(edf.overloaded);
    assert_eq!(edf.checked_points, 0);
    assert_eq!(edf.verdict, Verdict::Unschedulable);
}

#[test]
fn iteration_bound_is_reported_as_inconclusive() {
    let tasks = vec![Task::implicit("A", 1, 4), Task::implicit("B", 2, 6)];
    let dm = analyze_dm(&tasks, &RtaConfig { max_iterations: 1 }).unwrap();

    assert_eq!(dm.response_of("B").unwrap().outcome, ResponseOutcome::NonConvergence);
    assert_eq!(
        dm.verdict,
        Verdict::Inconclusive(Limitation::NonConvergence {
            task: "B".into(),
            iterations: 1,
            last_response: 3,
        })
    );
}

// ── DM versus EDF ────────────────────────────────────────────────────────────

#[test]
fn set_that_only_edf_can_schedule() {
    let set = TaskSet::new(
        "edf_only",
        vec![Task::implicit("t1", 2, 5), Task::implicit("t2", 4, 7)],
    );
    let report = evaluate(&set, &AnalysisConfig::default());

    let dm = report.dm.completed().unwrap();
    assert_eq!(dm.verdict, Verdict::Unschedulable);
    assert_eq!(dm.response_of("t2").unwrap().outcome, ResponseOutcome::DeadlineExceeded);
    assert_eq!(dm.wcrt_of("t2"), Some(8));

    assert!(report.edf.completed().unwrap().is_schedulable());

    let misses = |p: Policy| report.simulations[&p].completed().unwrap().total_missed();
    assert!(misses(Policy::Dm) > 0);
    assert_eq!(misses(Policy::Edf), 0);

    // only t1 converged, and the simulation agrees with its bound
    assert_eq!(report.cross_check, CrossCheck::Consistent { tasks_checked: 1 });
}

#[test]
fn simulated_worst_case_matches_rta_for_synchronous_release() {
    let tasks = vec![
        Task::implicit("a", 3, 10),
        Task::implicit("b", 5, 20),
        Task::implicit("c", 8, 50),
    ];
    let dm = analyze_dm(&tasks, &RtaConfig::default()).unwrap();
    let run = simulate(&tasks, &SimulationConfig::new(Policy::Dm, 100)).unwrap();

    for name in ["a", "b", "c"] {
        assert_eq!(run.stats_of(name).unwrap().max_response, dm.wcrt_of(name).unwrap(), "{name}");
    }
}

// ── Files and batches ────────────────────────────────────────────────────────

#[test]
fn directory_of_task_sets_through_batch_evaluation() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("a_example.yaml"),
        "tasks:\n  - { name: A, wcet: 1, period: 4 }\n  - { name: B, wcet: 2, period: 6 }\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b_overload.yaml"),
        "name: overload\ntasks:\n  - { name: x, wcet: 5, period: 10 }\n  - { name: y, wcet: 5, period: 10 }\n  - { name: z, wcet: 5, period: 10 }\n",
    )
    .unwrap();

    let config_path = dir.path().join("analysis.cfg");
    fs::write(
        &config_path,
        "simulation:\n  mode: random\n  runs: 2\n  policies: [dm, rm, edf]\n",
    )
    .unwrap();
    let config = AnalysisConfig::load_from_file(&config_path).unwrap();

    let files = collect_task_set_files(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(files.len(), 2);
    let sets: Vec<TaskSet> = files.iter().map(|p| load_task_set(p).unwrap()).collect();

    let reports = evaluate_batch(&sets, &config, 2);
    assert_eq!(reports.len(), 2);

    let example = &reports[0];
    assert_eq!(example.name, "a_example");
    assert_eq!(example.simulations.len(), 3);
    for outcome in example.simulations.values() {
        let Outcome::Completed(SimulationRecord::Aggregated(multi)) = outcome else {
            panic!("expected aggregated runs");
        };
        assert_eq!(multi.seeds, vec![1, 2]);
        assert_eq!(multi.total_missed(), 0);
    }
    assert!(example.cross_check.is_consistent());

    let overload = &reports[1];
    assert_eq!(overload.name, "overload");
    assert!(overload.dm.completed().unwrap().overloaded);
    assert!(overload.edf.completed().unwrap().overloaded);
    assert!(matches!(overload.cross_check, CrossCheck::Skipped { .. }));
}

#[test]
fn invalid_set_reports_structured_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "tasks:\n  - { name: a, wcet: 1, period: 0 }\n").unwrap();

    let set = load_task_set(&path).unwrap();
    let report = evaluate(&set, &AnalysisConfig::default());
    let yaml = serde_yaml::to_string(&report).unwrap();

    assert!(matches!(report.dm, Outcome::Failed(_)));
    assert!(yaml.contains("status: failed"));
    assert!(yaml.contains("kind: invalid_task_parameter"));
}
