//! A persistent Vivado TCL shell.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use super::id::SessionId;
use super::protocol::{self, Completion};
use super::state::SessionState;
use crate::error::{Result, VivadoError};
use crate::execution::CommandResult;
use crate::install::Installation;
use crate::output::{parse_tool_output, TextAccumulator};
use crate::process::{deadline_after, ProcessSpawner, ShellProcess, SpawnRequest};

/// Timing limits for session lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Overall limit for the startup handshake.
    pub startup: Duration,
    /// Upper bound on a single wait for output, so loops can re-check
    /// deadlines and child liveness.
    pub read_chunk: Duration,
    /// How long to absorb trailing output after the first prompt.
    pub drain: Duration,
    /// How long to wait for the child to honor `exit`.
    pub shutdown: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            startup: Duration::from_secs(60),
            read_chunk: Duration::from_secs(1),
            drain: Duration::from_millis(100),
            shutdown: Duration::from_secs(5),
        }
    }
}

/// Success flag and message of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Snapshot of a session for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub state: SessionState,
    pub vivado_version: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub working_directory: Option<PathBuf>,
    pub command_count: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
}

/// A long-lived `vivado -mode tcl` child and the protocol to drive it.
///
/// Commands run one at a time: the child handle lives behind an async mutex
/// that is held for the whole of `start()`, `execute()` and `close()`, so
/// concurrent callers queue up in FIFO order. The lifecycle state is kept
/// separately so [`state`](Self::state) and [`info`](Self::info) never wait
/// behind a running command.
///
/// No method returns an error. Failures are reported through the
/// [`Outcome`] or [`CommandResult`], and leave the session in
/// [`SessionState::Error`] when the child can no longer be trusted.
pub struct TclSession {
    id: SessionId,
    installation: Option<Installation>,
    working_directory: Option<PathBuf>,
    spawner: Arc<dyn ProcessSpawner>,
    timeouts: SessionTimeouts,
    status: RwLock<Status>,
    command_count: AtomicU64,
    process: Mutex<Option<ShellProcess>>,
}

impl TclSession {
    /// Create a closed session. Nothing is spawned until [`start`](Self::start).
    pub fn new(
        installation: Option<Installation>,
        working_directory: Option<PathBuf>,
        spawner: Arc<dyn ProcessSpawner>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            id: SessionId::new(),
            installation,
            working_directory,
            spawner,
            timeouts,
            status: RwLock::new(Status::default()),
            command_count: AtomicU64::new(0),
            process: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn installation(&self) -> Option<&Installation> {
        self.installation.as_ref()
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.status().state
    }

    /// Whether the session accepts commands (`Ready` or `Busy`).
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Commands that reached the child so far, including failed ones.
    pub fn command_count(&self) -> u64 {
        self.command_count.load(Ordering::SeqCst)
    }

    pub fn info(&self) -> SessionInfo {
        let status = self.status();
        SessionInfo {
            session_id: self.id,
            state: status.state,
            vivado_version: self.installation.as_ref().map(|i| i.version.clone()),
            started_at: status.started_at,
            working_directory: self.working_directory.clone(),
            command_count: self.command_count(),
        }
    }

    fn status(&self) -> Status {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SessionState) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(
            status.state.can_transition_to(next),
            "invalid session transition {} -> {}",
            status.state,
            next
        );
        trace!("Session {}: {} -> {}", self.id, status.state, next);
        status.state = next;
    }

    /// Spawn the shell and wait for its first prompt.
    pub async fn start(&self) -> Outcome {
        let mut process = self.process.lock().await;

        if self.is_active() {
            return Outcome::failed(VivadoError::AlreadyRunning.to_string());
        }

        // Restarting after a failure: the old child may still be alive.
        if let Some(mut stale) = process.take() {
            kill_quietly(&mut stale).await;
        }

        self.set_state(SessionState::Starting);

        match self.launch().await {
            Ok(child) => {
                *process = Some(child);
                {
                    let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
                    status.state = SessionState::Ready;
                    status.started_at = Some(Utc::now());
                }
                let version = self
                    .installation
                    .as_ref()
                    .map(|i| i.version.as_str())
                    .unwrap_or("unknown");
                info!("Session {} started with Vivado {}", self.id, version);
                Outcome::ok(format!("Session started with Vivado {}", version))
            }
            Err(e) => {
                self.set_state(SessionState::Error);
                warn!("Session {} failed to start: {}", self.id, e);
                Outcome::failed(e.to_string())
            }
        }
    }

    async fn launch(&self) -> Result<ShellProcess> {
        let installation = self
            .installation
            .as_ref()
            .ok_or(VivadoError::NoInstallation)?;

        let request = SpawnRequest::new(installation.executable.clone())
            .args(protocol::interactive_args())
            .working_dir(self.working_directory.clone());

        let mut child = self.spawner.spawn(&request).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                VivadoError::ExecutableNotFound(installation.executable.clone())
            }
            _ => VivadoError::Spawn(e),
        })?;

        match self.await_prompt(&mut child).await {
            Ok(()) => Ok(child),
            Err(e) => {
                kill_quietly(&mut child).await;
                Err(e)
            }
        }
    }

    async fn await_prompt(&self, child: &mut ShellProcess) -> Result<()> {
        let deadline = deadline_after(Instant::now(), self.timeouts.startup);
        let mut text = TextAccumulator::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(VivadoError::StartupTimeout);
            }
            let wait_until = deadline.min(deadline_after(now, self.timeouts.read_chunk));

            match timeout_at(wait_until, child.output.recv()).await {
                Ok(Some(chunk)) => {
                    text.push(&chunk);
                    if protocol::has_prompt(text.as_str()) {
                        break;
                    }
                }
                Ok(None) => {
                    return Err(VivadoError::ExitedDuringStartup(
                        text.into_text().trim().to_string(),
                    ));
                }
                Err(_) => {
                    if child.control.try_wait()?.is_some() {
                        return Err(VivadoError::ExitedDuringStartup(
                            text.into_text().trim().to_string(),
                        ));
                    }
                }
            }
        }

        // Absorb whatever trails the prompt.
        let drain_until = deadline_after(Instant::now(), self.timeouts.drain);
        while let Ok(Some(chunk)) = timeout_at(drain_until, child.output.recv()).await {
            trace!("Session {}: drained {} bytes", self.id, chunk.len());
        }

        Ok(())
    }

    /// Run one TCL command and wait up to `timeout` for it to finish.
    pub async fn execute(&self, command: &str, timeout: Duration) -> CommandResult {
        let mut process = self.process.lock().await;

        match self.state() {
            SessionState::Closed => {
                return CommandResult::failure(command, VivadoError::NotStarted.to_string())
            }
            SessionState::Error => {
                return CommandResult::failure(command, VivadoError::ErrorState.to_string())
            }
            _ => {}
        }

        let Some(child) = process.as_mut() else {
            return CommandResult::failure(command, VivadoError::ProcessUnavailable.to_string());
        };

        self.set_state(SessionState::Busy);
        debug!("Session {}: executing {}", self.id, command);

        let started = Instant::now();
        let deadline = deadline_after(started, timeout);
        let exchanged = self.exchange(child, command, deadline, timeout).await;
        let index = self.command_count.fetch_add(1, Ordering::SeqCst) + 1;

        let result = match exchanged {
            Ok((raw, completion)) => {
                self.set_state(SessionState::Ready);
                CommandResult::new(
                    command,
                    protocol::clean_output(&raw, command),
                    completion == Completion::Success,
                )
                .with_messages(parse_tool_output(&raw))
            }
            Err(e) => {
                self.set_state(SessionState::Error);
                warn!("Session {}: command failed: {}", self.id, e);
                CommandResult::failure(command, e.to_string())
            }
        };

        result
            .with_duration(started.elapsed())
            .with_session(self.id.to_string(), index)
    }

    /// Send a wrapped command and collect output up to its marker.
    async fn exchange(
        &self,
        child: &mut ShellProcess,
        command: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<(String, Completion)> {
        let wrapped = protocol::wrap_command(command);
        let written = timeout_at(deadline, async {
            child.stdin.write_all(wrapped.as_bytes()).await?;
            child.stdin.flush().await
        })
        .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                return Err(VivadoError::ProcessTerminated)
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(VivadoError::CommandTimeout(timeout)),
        }

        let mut text = TextAccumulator::new();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(VivadoError::CommandTimeout(timeout));
            }
            let wait_until = deadline.min(deadline_after(now, self.timeouts.read_chunk));

            match timeout_at(wait_until, child.output.recv()).await {
                Ok(Some(chunk)) => {
                    text.push(&chunk);
                    if let Some(completion) = protocol::find_completion(text.as_str()) {
                        return Ok((text.into_text(), completion));
                    }
                }
                Ok(None) => return Err(VivadoError::ProcessTerminated),
                Err(_) => {
                    if child.control.try_wait()?.is_some() {
                        return Err(VivadoError::ProcessTerminated);
                    }
                }
            }
        }
    }

    /// Ask the shell to exit, force-killing it if it does not comply.
    pub async fn close(&self) -> Outcome {
        let mut process = self.process.lock().await;

        if self.state() == SessionState::Closed {
            return Outcome::ok("Session is already closed");
        }

        let Some(mut child) = process.take() else {
            self.set_state(SessionState::Closed);
            return Outcome::ok("Session closed");
        };

        let shutdown = self.shutdown(&mut child).await;
        self.set_state(SessionState::Closed);

        match shutdown {
            Ok(false) => {
                info!("Session {} closed", self.id);
                Outcome::ok("Session closed successfully")
            }
            Ok(true) => {
                info!("Session {} force-killed after ignoring exit", self.id);
                Outcome::ok("Session closed successfully (process was force-killed)")
            }
            Err(e) => {
                warn!("Session {}: error while closing: {}", self.id, e);
                Outcome::failed(format!("Error closing session: {}", e))
            }
        }
    }

    /// Returns whether a force-kill was needed.
    async fn shutdown(&self, child: &mut ShellProcess) -> Result<bool> {
        let deadline = deadline_after(Instant::now(), self.timeouts.shutdown);
        let exited = timeout_at(deadline, async {
            child
                .stdin
                .write_all(protocol::EXIT_COMMAND.as_bytes())
                .await?;
            child.stdin.flush().await?;
            child.control.wait().await
        })
        .await;

        match exited {
            Ok(Ok(code)) => {
                debug!("Session {}: Vivado exited with code {}", self.id, code);
                return Ok(false);
            }
            Ok(Err(e)) => debug!("Session {}: graceful exit failed: {}", self.id, e),
            Err(_) => debug!("Session {}: no exit within {:?}", self.id, self.timeouts.shutdown),
        }

        if child.control.try_wait()?.is_some() {
            return Ok(false);
        }
        child.control.kill().await?;
        Ok(true)
    }
}

impl std::fmt::Debug for TclSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TclSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("installation", &self.installation)
            .field("working_directory", &self.working_directory)
            .finish_non_exhaustive()
    }
}

async fn kill_quietly(child: &mut ShellProcess) {
    if let Err(e) = child.control.kill().await {
        warn!("Failed to kill Vivado process: {}", e);
    }
}
