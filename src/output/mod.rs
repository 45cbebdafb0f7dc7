//! Output processing for Vivado child processes.
//!
//! This module provides:
//! - Sanitizing raw bytes into plain text (escape sequences, CRLF)
//! - Extracting `ERROR` / `CRITICAL WARNING` messages from tool output
//!
//! # Example
//!
//! ```
//! use vivado_shell::output::{parse_tool_output, OutputSanitizer};
//!
//! let text = OutputSanitizer::to_text(b"ERROR: [Synth 8-87] Signal not found\r\n");
//! let parsed = parse_tool_output(&text);
//! assert_eq!(parsed.errors[0].id, "Synth 8-87");
//! ```

mod messages;
mod sanitizer;

pub use messages::{parse_tool_output, Message, ParsedOutput, Severity};
pub use sanitizer::{OutputSanitizer, TextAccumulator};
