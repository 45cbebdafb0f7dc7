//! # vivado-shell
//!
//! Persistent Vivado TCL shell sessions.
//!
//! Starting Vivado takes tens of seconds, so running every TCL command in a
//! fresh `vivado -mode batch` process is slow and loses all design state in
//! between. This crate keeps `vivado -mode tcl` children alive and drives
//! them over stdin/stdout, one command at a time per session.
//!
//! ## Features
//!
//! - **Sessions**: long-lived TCL shells with a small lifecycle state machine
//! - **Registry**: several sessions side by side, with a default one
//! - **Batch fallback**: one-shot runs when no session is available
//! - **Message parsing**: Vivado `ERROR` / `CRITICAL WARNING` lines as data
//! - **Discovery**: locates installations under the standard Xilinx roots
//! - **Build status**: reads `<project>.runs/` without starting Vivado
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use vivado_shell::{Detector, SessionRegistry, SessionTimeouts, TokioSpawner};
//!
//! #[tokio::main]
//! async fn main() {
//!     vivado_shell::logging::try_init().ok();
//!
//!     let registry = SessionRegistry::new(
//!         Arc::new(TokioSpawner::new()),
//!         Arc::new(Detector::default()),
//!         SessionTimeouts::default(),
//!     );
//!
//!     let (session, outcome) = registry.create(None, None, true).await;
//!     println!("{}", outcome.message);
//!
//!     let result = session.execute("expr 2+2", Duration::from_secs(30)).await;
//!     println!("{} -> {}", result.command, result.output);
//!
//!     registry.close_all().await;
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod install;
pub mod logging;
pub mod output;
pub mod process;
pub mod project;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, VivadoError};
pub use execution::{run_batch_command, CommandResult};
pub use install::{Detector, Installation, InstallationResolver};
pub use output::{parse_tool_output, Message, OutputSanitizer, ParsedOutput, Severity};
pub use process::{ProcessSpawner, TokioSpawner};
pub use project::{build_status, BuildState, BuildStatus, RunStatus};
pub use session::{
    Outcome, SessionId, SessionInfo, SessionRegistry, SessionState, SessionTimeouts, TclSession,
};
