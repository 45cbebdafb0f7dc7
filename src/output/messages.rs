//! Parsing of Vivado `SEVERITY: [ID] text` messages.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Severity of a tool-reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "CRITICAL WARNING")]
    CriticalWarning,
    #[serde(rename = "WARNING")]
    Warning,
}

impl Severity {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ERROR" => Some(Severity::Error),
            "CRITICAL WARNING" => Some(Severity::CriticalWarning),
            "WARNING" => Some(Severity::Warning),
            _ => None,
        }
    }

    /// The tag Vivado prints for this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::CriticalWarning => "CRITICAL WARNING",
            Severity::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single error or warning reported by Vivado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub severity: Severity,
    /// Message identifier, e.g. `Synth 8-87`.
    pub id: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Errors and critical warnings extracted from a block of output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub errors: Vec<Message>,
    pub critical_warnings: Vec<Message>,
}

impl ParsedOutput {
    /// Whether any ERROR message was found.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^(ERROR|CRITICAL WARNING|WARNING):\s*\[([^\]]+)\]\s*(.+)$")
            .expect("message pattern is valid")
    })
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"['"](.*?)['"](?:\s+line\s+(\d+))?"#).expect("location pattern is valid")
    })
}

/// Extract errors and critical warnings from Vivado output.
///
/// Plain `WARNING` lines are recognized but not collected.
pub fn parse_tool_output(output: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();

    for caps in message_pattern().captures_iter(output) {
        let Some(severity) = Severity::from_tag(&caps[1]) else {
            continue;
        };
        let message = caps[3].trim().to_string();

        let (file, line) = match location_pattern().captures(&message) {
            Some(loc) => (
                loc.get(1).map(|m| m.as_str().to_string()),
                loc.get(2).and_then(|m| m.as_str().parse().ok()),
            ),
            None => (None, None),
        };

        let entry = Message {
            severity,
            id: caps[2].to_string(),
            message,
            file,
            line,
        };

        match severity {
            Severity::Error => parsed.errors.push(entry),
            Severity::CriticalWarning => parsed.critical_warnings.push(entry),
            Severity::Warning => {}
        }
    }

    parsed
}
