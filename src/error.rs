//! Error types for vivado-shell.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for vivado-shell operations.
///
/// Session and registry operations never hand these to callers directly:
/// they are rendered into the message of an [`Outcome`](crate::Outcome) or
/// [`CommandResult`](crate::CommandResult).
#[derive(Error, Debug)]
pub enum VivadoError {
    /// No Vivado installation could be resolved.
    #[error("No Vivado installation found. Install Vivado or set VIVADO_PATH.")]
    NoInstallation,

    /// The resolved executable does not exist.
    #[error("Vivado executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    /// Spawning the child process failed for another reason.
    #[error("Failed to start Vivado: {0}")]
    Spawn(std::io::Error),

    /// The ready prompt did not appear in time.
    #[error("Timeout waiting for Vivado to start")]
    StartupTimeout,

    /// The child exited before printing its prompt.
    #[error("Vivado process exited during startup: {0}")]
    ExitedDuringStartup(String),

    /// `start()` was called on a running session.
    #[error("Session is already running")]
    AlreadyRunning,

    /// `execute()` was called before `start()`.
    #[error("Session is not started. Call start() first.")]
    NotStarted,

    /// The session is in the sticky error state.
    #[error("Session is in error state. Close and restart.")]
    ErrorState,

    /// The session has no child process attached.
    #[error("Session process is not available.")]
    ProcessUnavailable,

    /// No completion marker arrived before the deadline.
    #[error("Command timed out after {} seconds", format_secs(.0))]
    CommandTimeout(Duration),

    /// The child closed its pipes or exited mid-command.
    #[error("Session process has terminated unexpectedly")]
    ProcessTerminated,

    /// Session with the given ID was not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Neither an explicit nor a default session exists.
    #[error("No session to close")]
    NoSession,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for vivado-shell operations.
pub type Result<T> = std::result::Result<T, VivadoError>;

fn format_secs(duration: &Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{:.1}", secs)
    } else {
        format!("{}", secs)
    }
}
