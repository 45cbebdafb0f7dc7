//! Command result type.

use std::time::Duration;

use serde::Serialize;

use crate::output::{Message, ParsedOutput};

/// Result of running one TCL command, in a session or in batch mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandResult {
    /// Whether the command completed without a TCL error or a tool ERROR.
    pub success: bool,
    /// The command as given by the caller.
    pub command: String,
    /// Cleaned output, or a diagnostic when the command never ran.
    pub output: String,
    /// `ERROR` messages reported by the tool.
    pub errors: Vec<Message>,
    /// `CRITICAL WARNING` messages reported by the tool.
    pub critical_warnings: Vec<Message>,
    /// Wall-clock time spent waiting for the command.
    pub execution_time_ms: f64,
    /// Session that ran the command. Absent for batch runs and rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The session's command count after this command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_index: Option<u64>,
}

impl CommandResult {
    /// Create a completed result. `success` is downgraded if the parsed
    /// output contains errors.
    pub fn new(command: impl Into<String>, output: impl Into<String>, success: bool) -> Self {
        Self {
            success,
            command: command.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Create a failed result whose output is a diagnostic message.
    pub fn failure(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(command, message, false)
    }

    /// Attach parsed tool messages. Any error marks the result as failed.
    pub fn with_messages(mut self, parsed: ParsedOutput) -> Self {
        if parsed.has_errors() {
            self.success = false;
        }
        self.errors = parsed.errors;
        self.critical_warnings = parsed.critical_warnings;
        self
    }

    /// Set the elapsed time.
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.execution_time_ms = elapsed.as_secs_f64() * 1000.0;
        self
    }

    /// Tag the result with the session that produced it.
    pub fn with_session(mut self, session_id: impl Into<String>, command_index: u64) -> Self {
        self.session_id = Some(session_id.into());
        self.command_index = Some(command_index);
        self
    }

    /// Number of `ERROR` messages.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of `CRITICAL WARNING` messages.
    pub fn critical_warning_count(&self) -> usize {
        self.critical_warnings.len()
    }
}
