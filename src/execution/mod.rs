//! Command results and one-shot batch execution.
//!
//! Persistent sessions live in [`crate::session`]. This module holds the
//! result type both paths return, and the stateless fallback used when no
//! session is running.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vivado_shell::execution::run_batch_command;
//! use vivado_shell::install::{Detector, InstallationResolver};
//! use vivado_shell::process::TokioSpawner;
//!
//! # async fn demo() {
//! let installation = Detector::default().resolve();
//! let result = run_batch_command(
//!     &TokioSpawner::new(),
//!     installation.as_ref(),
//!     "version",
//!     Duration::from_secs(120),
//! )
//! .await;
//! println!("{}", result.output);
//! # }
//! ```

mod batch;
mod result;

pub use batch::run_batch_command;
pub use result::CommandResult;
