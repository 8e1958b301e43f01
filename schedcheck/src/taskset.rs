//! Task-set files.
//!
//! A task set is a YAML document:
//! ```yaml
//! name: example          # optional, defaults to the file stem
//! tasks:
//!   - { name: A, wcet: 1, period: 4 }              # deadline = period
//!   - { name: B, wcet: 2, period: 6, deadline: 5, bcet: 1, jitter: 0 }
//! ```
//!
//! Loading only parses; parameter validation happens in the analyzers so
//! that each analysis reports its own structured error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::task::{Task, Time};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskSetFile {
    name: Option<String>,
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    name: String,
    wcet: Time,
    period: Time,
    deadline: Option<Time>,
    bcet: Option<Time>,
    #[serde(default)]
    jitter: Time,
}

impl From<TaskEntry> for Task {
    fn from(e: TaskEntry) -> Self {
        Task {
            deadline: e.deadline.unwrap_or(e.period),
            name: e.name,
            wcet: e.wcet,
            bcet: e.bcet,
            period: e.period,
            jitter: e.jitter,
        }
    }
}

/// A named list of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSet {
    pub name: String,
    pub tasks: Vec<Task>,
}

impl TaskSet {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }

    /// Parse a task set from YAML text; `fallback_name` is used when the
    /// document has no `name`.
    pub fn from_yaml(content: &str, fallback_name: &str) -> Result<Self> {
        let file: TaskSetFile = serde_yaml::from_str(content)?;
        Ok(Self {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            tasks: file.tasks.into_iter().map(Task::from).collect(),
        })
    }
}

/// Load one task-set file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid task-set
/// document.
pub fn load_task_set(path: &Path) -> Result<TaskSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open task set file: {}", path.display()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let set = TaskSet::from_yaml(&content, &stem)
        .with_context(|| format!("Failed to parse task set: {}", path.display()))?;

    debug!(name = %set.name, tasks = set.tasks.len(), "Loaded task set");
    Ok(set)
}

/// Expand `paths` into task-set files: files are taken as-is, directories
/// contribute their `*.yaml` / `*.yml` entries in name order.
pub fn collect_task_set_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Cannot read directory: {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_yaml(p))
                .collect();
            found.sort();
            info!(dir = %path.display(), count = found.len(), "Discovered task set files");
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
