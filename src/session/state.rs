//! Session state machine.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a TCL session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Child spawned, waiting for the first prompt.
    Starting,
    /// Idle and accepting commands.
    Ready,
    /// A command is in flight.
    Busy,
    /// No child process. Initial state, and the state after `close()`.
    #[default]
    Closed,
    /// Startup failed, a command timed out, or the child died.
    /// Commands are rejected until the session is closed or restarted.
    Error,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Closed | Error -> Starting
    /// - Starting -> Ready | Error
    /// - Ready -> Busy
    /// - Busy -> Ready | Error
    /// - Starting | Ready | Busy | Error -> Closed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Closed, Starting)
                | (Error, Starting)
                | (Starting, Ready)
                | (Starting, Error)
                | (Ready, Busy)
                | (Busy, Ready)
                | (Busy, Error)
                | (Starting, Closed)
                | (Ready, Closed)
                | (Busy, Closed)
                | (Error, Closed)
        )
    }

    /// Whether the session owns a live shell that accepts commands.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Busy)
    }

    /// Lowercase name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
