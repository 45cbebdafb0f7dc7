//! Persistent TCL sessions.
//!
//! A [`TclSession`] owns one long-running `vivado -mode tcl` child and runs
//! commands through it one at a time. A [`SessionRegistry`] keeps the
//! started sessions, remembers a default, and falls back to a one-shot batch
//! run when no session is available.

mod id;
mod protocol;
mod registry;
mod shell;
mod state;

pub use id::SessionId;
pub use protocol::{
    batch_args, clean_output, find_completion, interactive_args, wrap_command, Completion,
    COMPLETION_MARKER, ERROR_MARKER, EXIT_COMMAND, PROMPT,
};
pub use registry::SessionRegistry;
pub use shell::{Outcome, SessionInfo, SessionTimeouts, TclSession};
pub use state::SessionState;
