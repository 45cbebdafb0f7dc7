//! Session identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, Serializer};

/// Global counter for session ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a TCL session.
///
/// Session IDs come from a process-wide atomic counter, so they are never
/// reused and order by creation time. The ID is displayed as
/// `tcl-XXXXXXXX` where X is a hexadecimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new unique session ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a SessionId from a raw u64 value.
    ///
    /// This is primarily for testing and deserialization.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcl-{:08x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = crate::error::VivadoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("tcl-")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(SessionId::from_raw)
            .ok_or_else(|| crate::error::VivadoError::SessionNotFound(s.into()))
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
