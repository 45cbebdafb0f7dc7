//! Child process abstraction.
//!
//! Sessions and one-shot batch runs never touch `tokio::process` directly.
//! They go through a [`ProcessSpawner`], which hands back a [`ShellProcess`]:
//! a writable stdin, a single stream of output chunks (stdout and stderr
//! merged), and a [`ProcessControl`] handle for liveness checks, waiting and
//! killing. Tests substitute scripted children through the same seam.

#[cfg(test)]
pub(crate) mod mock;
mod native;
mod pump;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub use native::TokioSpawner;
pub use pump::{pump_output, OUTPUT_CHANNEL_CAPACITY, READ_BUFFER_SIZE};

/// Receiving side of a child's merged output.
///
/// The channel closes once every output stream of the child reached EOF.
pub type OutputReceiver = mpsc::Receiver<Vec<u8>>;

/// Writable stdin of a child.
pub type InputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Longest wait a deadline can express, roughly thirty years.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + timeout`, saturating at [`FAR_FUTURE`] so huge timeouts mean
/// "no limit" instead of overflowing `Instant`.
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start + timeout.min(FAR_FUTURE)
}

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Working directory for the child, if any.
    pub working_dir: Option<PathBuf>,
}

impl SpawnRequest {
    /// Create a request with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

/// Lifecycle control over a spawned child.
#[async_trait]
pub trait ProcessControl: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit check. `Ok(Some(code))` once the child has exited;
    /// children terminated by a signal report `-1`.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Wait for the child to exit and return its exit code.
    async fn wait(&mut self) -> io::Result<i32>;

    /// Force-kill the child and reap it.
    async fn kill(&mut self) -> io::Result<()>;
}

/// A running child with its streams.
pub struct ShellProcess {
    pub stdin: InputStream,
    pub output: OutputReceiver,
    pub control: Box<dyn ProcessControl>,
}

impl std::fmt::Debug for ShellProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellProcess")
            .field("pid", &self.control.id())
            .finish_non_exhaustive()
    }
}

/// Launches child processes.
pub trait ProcessSpawner: Send + Sync {
    /// Spawn a child with piped stdio.
    ///
    /// Must be called from within a tokio runtime.
    fn spawn(&self, request: &SpawnRequest) -> io::Result<ShellProcess>;
}
