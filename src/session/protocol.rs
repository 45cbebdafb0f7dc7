//! Framing of commands and responses on a Vivado TCL shell.
//!
//! Vivado's own prompt is not a reliable end-of-output signal, so every
//! command is wrapped in a `catch` block that prints one of two markers once
//! the command has finished.

use std::path::Path;

/// Printed after a command that completed normally.
pub const COMPLETION_MARKER: &str = "<<<VIVADO_MCP_CMD_COMPLETE>>>";

/// Printed after a command that raised a TCL error.
pub const ERROR_MARKER: &str = "<<<VIVADO_MCP_CMD_ERROR>>>";

/// Interactive prompt printed by `vivado -mode tcl`.
pub const PROMPT: &str = "Vivado%";

/// Sent to request a graceful shutdown.
pub const EXIT_COMMAND: &str = "exit\n";

/// Arguments for an interactive TCL shell.
pub fn interactive_args() -> [&'static str; 4] {
    ["-mode", "tcl", "-nojournal", "-nolog"]
}

/// Arguments for a one-shot batch run of `script`.
pub fn batch_args(script: &Path) -> Vec<String> {
    vec![
        "-mode".to_string(),
        "batch".to_string(),
        "-source".to_string(),
        script.to_string_lossy().into_owned(),
        "-nojournal".to_string(),
        "-nolog".to_string(),
    ]
}

/// Wrap `command` so that its completion is announced with a marker.
///
/// The command's result (or error text) is printed before the marker.
pub fn wrap_command(command: &str) -> String {
    format!(
        r#"
if {{[catch {{{command}}} result]}} {{
    puts $result
    puts "{ERROR_MARKER}"
}} else {{
    if {{$result ne ""}} {{
        puts $result
    }}
    puts "{COMPLETION_MARKER}"
}}
"#
    )
}

/// How a wrapped command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The completion marker was seen.
    Success,
    /// The error marker was seen.
    Failure,
}

/// Look for either marker in accumulated output.
pub fn find_completion(text: &str) -> Option<Completion> {
    if text.contains(ERROR_MARKER) {
        Some(Completion::Failure)
    } else if text.contains(COMPLETION_MARKER) {
        Some(Completion::Success)
    } else {
        None
    }
}

/// Whether the interactive prompt has appeared (case-insensitive).
pub fn has_prompt(text: &str) -> bool {
    text.to_lowercase().contains("vivado%")
}

fn strip_prompts(mut line: &str) -> &str {
    loop {
        match line.trim_start().strip_prefix(PROMPT) {
            Some(rest) => line = rest.trim_start(),
            None => return line,
        }
    }
}

/// Reduce raw session output to what the command itself printed.
///
/// Removes both markers, prompt strings at the start of a line, blank lines,
/// and any line equal to the command text. A command whose genuine output
/// repeats the command text verbatim loses that line.
///
/// A leading prompt is stripped, not the whole line: `Vivado% 4` yields `4`.
pub fn clean_output(raw: &str, command: &str) -> String {
    let command = command.trim();
    let unmarked = raw.replace(COMPLETION_MARKER, "").replace(ERROR_MARKER, "");

    unmarked
        .lines()
        .map(strip_prompts)
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && trimmed != command
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_command_shape() {
        let wrapped = wrap_command("get_property TOP [current_fileset]");
        assert!(wrapped.contains("if {[catch {get_property TOP [current_fileset]} result]} {"));
        assert!(wrapped.contains(&format!("puts \"{}\"", ERROR_MARKER)));
        assert!(wrapped.contains(&format!("puts \"{}\"", COMPLETION_MARKER)));
        assert!(wrapped.ends_with("}\n"));
        // The error branch precedes the success branch.
        assert!(wrapped.find(ERROR_MARKER) < wrapped.find(COMPLETION_MARKER));
    }

    #[test]
    fn test_find_completion() {
        assert_eq!(find_completion("partial output"), None);
        assert_eq!(
            find_completion(&format!("4\n{}\n", COMPLETION_MARKER)),
            Some(Completion::Success)
        );
        assert_eq!(
            find_completion(&format!("bad\n{}\n", ERROR_MARKER)),
            Some(Completion::Failure)
        );
    }

    #[test]
    fn test_has_prompt() {
        assert!(has_prompt("****** Vivado v2023.2\nVivado% "));
        assert!(has_prompt("vivado% "));
        assert!(!has_prompt("Starting Vivado..."));
    }

    #[test]
    fn test_clean_output_basic() {
        let raw = format!("4\n{}\nVivado% ", COMPLETION_MARKER);
        assert_eq!(clean_output(&raw, "expr 2+2"), "4");
    }

    #[test]
    fn test_clean_output_preserves_indentation() {
        let raw = format!(
            "  Slice LUTs |  120\n  Registers  |   64\n\n{}\n",
            COMPLETION_MARKER
        );
        assert_eq!(
            clean_output(&raw, "report_utilization"),
            "  Slice LUTs |  120\n  Registers  |   64"
        );
    }

    #[test]
    fn test_clean_output_strips_leading_prompt() {
        // Prompt left over from the previous command, glued to this output.
        let raw = format!("Vivado% hello\n{}\nVivado% ", COMPLETION_MARKER);
        assert_eq!(clean_output(&raw, "puts hello"), "hello");
    }

    #[test]
    fn test_clean_output_drops_command_echo() {
        let raw = format!("puts hello\nhello\n{}\n", COMPLETION_MARKER);
        assert_eq!(clean_output(&raw, "  puts hello  "), "hello");
    }

    #[test]
    fn test_clean_output_error_marker() {
        let raw = format!("invalid command name \"foo\"\n{}\n", ERROR_MARKER);
        assert_eq!(clean_output(&raw, "foo"), "invalid command name \"foo\"");
    }

    #[test]
    fn test_batch_args() {
        let args = batch_args(Path::new("/tmp/vivado_cmd_x.tcl"));
        assert_eq!(
            args,
            vec![
                "-mode",
                "batch",
                "-source",
                "/tmp/vivado_cmd_x.tcl",
                "-nojournal",
                "-nolog"
            ]
        );
    }
}
