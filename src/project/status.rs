//! Run and build status read from `<project>.runs/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

const SYNTH_RUN: &str = "synth_1";
const IMPL_RUN: &str = "impl_1";

const BEGIN_MARKER: &str = ".vivado.begin.rst";
const END_MARKER: &str = ".vivado.end.rst";
const ERROR_MARKER: &str = ".vivado.error.rst";
const RUN_LOG: &str = "runme.log";
const PROGRESS_FILE: &str = "vivado.pb";

/// Log lines naming a finished step, in lookup order.
const COMPLETION_MESSAGES: &[&str] = &[
    "synth_design Complete!",
    "place_design Complete!",
    "route_design Complete!",
    "write_bitstream Complete!",
    "Implementation successful",
    "Synthesis successful",
];

fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Progress:\s*(\d+%)").expect("progress pattern is valid"))
}

fn log_error_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"ERROR:\s*\[").expect("error pattern is valid"))
}

/// Where a run, or a whole build, stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Status of one Vivado run such as `synth_1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub name: String,
    pub state: BuildState,
    /// Last `Progress: N%` seen in `runme.log`.
    pub progress: Option<String>,
    pub status_message: Option<String>,
    /// Newest modification time among the run's status files.
    pub timestamp: Option<DateTime<Utc>>,
}

impl RunStatus {
    fn new(name: &str, state: BuildState) -> Self {
        Self {
            name: name.to_string(),
            state,
            progress: None,
            status_message: None,
            timestamp: None,
        }
    }

    fn with_progress(mut self, progress: Option<String>) -> Self {
        self.progress = progress;
        self
    }

    fn with_message(mut self, message: Option<&str>) -> Self {
        self.status_message = message.map(str::to_string);
        self
    }

    fn at(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Overall build status of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStatus {
    pub project_path: PathBuf,
    pub overall_state: BuildState,
    pub synthesis: Option<RunStatus>,
    pub implementation: Option<RunStatus>,
    pub last_build_timestamp: Option<DateTime<Utc>>,
    pub runs_directory_exists: bool,
    /// First `.bit` file in the implementation run, if any.
    pub bitstream: Option<PathBuf>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Entries of `dir` with extension `ext` (any case), sorted by path.
fn with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        })
        .collect();
    found.sort();
    found
}

fn run_timestamp(run_dir: &Path) -> Option<DateTime<Utc>> {
    [RUN_LOG, PROGRESS_FILE, BEGIN_MARKER, END_MARKER]
        .iter()
        .filter_map(|name| modified(&run_dir.join(name)))
        .max()
        .or_else(|| modified(run_dir))
        .map(DateTime::<Utc>::from)
}

/// Status of the run stored in `run_dir`.
///
/// An `ERROR: [..]` line in `runme.log` fails the run regardless of the
/// marker files. Otherwise the error marker, then the end marker, then the
/// begin marker decide. A log with no markers at all is an interrupted run.
pub fn run_status(run_dir: &Path, name: &str) -> RunStatus {
    if !run_dir.exists() {
        return RunStatus::new(name, BuildState::NotStarted);
    }

    let timestamp = run_timestamp(run_dir);
    let log_path = run_dir.join(RUN_LOG);
    let mut progress = None;
    let mut message = None;

    if let Ok(bytes) = fs::read(&log_path) {
        let log = String::from_utf8_lossy(&bytes);
        progress = progress_pattern()
            .captures_iter(&log)
            .last()
            .map(|caps| caps[1].to_string());
        message = COMPLETION_MESSAGES
            .iter()
            .find(|m| log.contains(*m))
            .copied();

        if log_error_pattern().is_match(&log) {
            return RunStatus::new(name, BuildState::Failed)
                .with_progress(progress)
                .with_message(Some("Build failed with errors"))
                .at(timestamp);
        }
    }

    if run_dir.join(ERROR_MARKER).exists() {
        return RunStatus::new(name, BuildState::Failed)
            .with_progress(progress)
            .with_message(Some(message.unwrap_or("Build failed")))
            .at(timestamp);
    }

    if run_dir.join(END_MARKER).exists() {
        let done = RunStatus::new(name, BuildState::Completed).at(timestamp);
        if let Some(step) = message.filter(|m| m.contains("Complete")) {
            return done
                .with_progress(Some("100%".to_string()))
                .with_message(Some(step));
        }
        if name.starts_with("impl") && !with_extension(run_dir, "bit").is_empty() {
            return done
                .with_progress(Some("100%".to_string()))
                .with_message(Some("Bitstream generated"));
        }
        return done
            .with_progress(progress.or_else(|| Some("100%".to_string())))
            .with_message(message);
    }

    if run_dir.join(BEGIN_MARKER).exists() {
        return RunStatus::new(name, BuildState::InProgress)
            .with_progress(progress)
            .with_message(Some(message.unwrap_or("Build in progress")))
            .at(timestamp);
    }

    if log_path.exists() {
        return RunStatus::new(name, BuildState::Failed)
            .with_progress(progress)
            .with_message(Some("Run incomplete or interrupted"))
            .at(timestamp);
    }

    RunStatus::new(name, BuildState::NotStarted).at(timestamp)
}

/// `<name>.runs` next to the project, named after the `.xpr` when one is
/// known, else the first `*.runs` directory present.
fn runs_directory(project: &Path) -> Option<PathBuf> {
    let project_dir = if project.is_file() {
        project.parent().unwrap_or(Path::new(""))
    } else {
        project
    };

    let xpr = if project.is_file()
        && project
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("xpr"))
    {
        Some(project.to_path_buf())
    } else {
        with_extension(project_dir, "xpr")
            .into_iter()
            .find(|p| p.is_file())
    };

    if let Some(stem) = xpr.as_deref().and_then(Path::file_stem) {
        let runs = project_dir.join(format!("{}.runs", stem.to_string_lossy()));
        if runs.is_dir() {
            return Some(runs);
        }
    }

    with_extension(project_dir, "runs")
        .into_iter()
        .find(|p| p.is_dir())
}

fn first_bitstream(runs_dir: &Path) -> Option<PathBuf> {
    with_extension(&runs_dir.join(IMPL_RUN), "bit").into_iter().next()
}

/// First bitstream produced by the project's `impl_1` run.
pub fn find_bitstream(project: &Path) -> Option<PathBuf> {
    runs_directory(project).and_then(|runs| first_bitstream(&runs))
}

fn overall_state(synthesis: BuildState, implementation: BuildState) -> BuildState {
    use BuildState::*;

    let either = |state: BuildState| synthesis == state || implementation == state;
    if either(InProgress) {
        InProgress
    } else if either(Failed) {
        Failed
    } else if either(Completed) {
        Completed
    } else {
        NotStarted
    }
}

/// Build status of the project at `project`, an `.xpr` file or the
/// directory holding it.
///
/// Only reads files; a missing project simply reports `not_started`.
pub fn build_status(project: &Path) -> BuildStatus {
    let Some(runs_dir) = runs_directory(project) else {
        debug!("No runs directory for {}", project.display());
        return BuildStatus {
            project_path: project.to_path_buf(),
            overall_state: BuildState::NotStarted,
            synthesis: None,
            implementation: None,
            last_build_timestamp: None,
            runs_directory_exists: false,
            bitstream: None,
        };
    };
    trace!("Reading run status from {}", runs_dir.display());

    let synthesis = run_status(&runs_dir.join(SYNTH_RUN), SYNTH_RUN);
    let implementation = run_status(&runs_dir.join(IMPL_RUN), IMPL_RUN);

    BuildStatus {
        project_path: project.to_path_buf(),
        overall_state: overall_state(synthesis.state, implementation.state),
        last_build_timestamp: synthesis.timestamp.max(implementation.timestamp),
        bitstream: first_bitstream(&runs_dir),
        synthesis: Some(synthesis),
        implementation: Some(implementation),
        runs_directory_exists: true,
    }
}
