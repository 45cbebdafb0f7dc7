//! Command-line interface for vivado-shell.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::MAX_TIMEOUT_SECS;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Explicit Vivado version directory.
    pub vivado_path: Option<PathBuf>,
    /// Vivado release to select among detected installations.
    pub vivado_version: Option<String>,
    /// Working directory for the TCL session.
    pub workdir: Option<PathBuf>,
    /// Per-command timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// TCL commands to run non-interactively, in order.
    pub exec: Vec<String>,
    /// Run `--exec` commands in one-shot batch mode instead of a session.
    pub batch: bool,
    /// List detected installations and exit.
    pub detect: bool,
    /// Print the build status of this project (`.xpr` or its directory) and exit.
    pub status: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('P') | Long("vivado-path") => {
                result.vivado_path = Some(parser.value()?.parse()?);
            }
            Long("vivado-version") => {
                result.vivado_version = Some(parser.value()?.parse()?);
            }
            Short('d') | Long("workdir") => {
                result.workdir = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("timeout", value.clone()))?;
                if secs == 0 || secs > MAX_TIMEOUT_SECS {
                    return Err(ArgsError::InvalidValue("timeout", value));
                }
                result.timeout_secs = Some(secs);
            }
            Short('e') | Long("exec") => {
                result.exec.push(parser.value()?.parse()?);
            }
            Long("batch") => {
                result.batch = true;
            }
            Long("detect") => {
                result.detect = true;
            }
            Long("status") => {
                result.status = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.batch && result.exec.is_empty() {
        return Err(ArgsError::MissingValue("--batch requires at least one --exec"));
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"vivado-shell {version}
Persistent Vivado TCL shell sessions

USAGE:
    vivado-shell [OPTIONS]

Without --exec, --detect or --status, starts a TCL session and reads
commands from stdin, one per line, printing each result as JSON.

OPTIONS:
    -c, --config <FILE>         Path to configuration file (JSON)
    -P, --vivado-path <DIR>     Vivado version directory to use
        --vivado-version <VER>  Vivado release to use (e.g. 2023.2)
    -d, --workdir <DIR>         Working directory for the TCL session
    -t, --timeout <SECS>        Per-command timeout, at most 604800 [default: 300]
    -e, --exec <TCL>            Run a TCL command (repeatable)
        --batch                 Run --exec commands in batch mode, no session
        --detect                List detected Vivado installations
        --status <XPR>          Show synthesis/implementation status of a project
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    VIVADO_PATH                 Vivado version directory (overrides config)
    VIVADO_VERSION              Vivado release (overrides config)
    VIVADO_SEARCH_PATHS         Extra install roots, ':' or ';' separated
    VIVADO_SHELL_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # Interactive session with the newest detected Vivado
    vivado-shell

    # Query a project through a persistent session
    vivado-shell -d ./proj -e "open_project top.xpr" -e "report_utilization"

    # One-shot batch run with a pinned release
    vivado-shell --vivado-version 2023.2 --batch -e "version"
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("vivado-shell {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
    /// A flag combination is missing a required value.
    MissingValue(&'static str),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
            Self::MissingValue(what) => f.write_str(what),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
