//! Native child processes via `tokio::process`.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::debug;

use super::pump::{pump_output, OUTPUT_CHANNEL_CAPACITY};
use super::{ProcessControl, ProcessSpawner, ShellProcess, SpawnRequest};

/// Spawns real child processes.
///
/// stdout and stderr are both pumped into the same output channel, which
/// matches how Vivado interleaves its messages on a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TokioSpawner {
    /// Create a new spawner.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<ShellProcess> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        debug!(
            "spawned {} (pid {:?})",
            request.program.display(),
            child.id()
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stderr not captured"))?;

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        tokio::spawn(pump_output(stdout, tx.clone(), "stdout"));
        tokio::spawn(pump_output(stderr, tx, "stderr"));

        Ok(ShellProcess {
            stdin: Box::new(stdin),
            output: rx,
            control: Box::new(NativeChild { child }),
        })
    }
}

struct NativeChild {
    child: Child,
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[async_trait]
impl ProcessControl for NativeChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(exit_code))
    }

    async fn wait(&mut self) -> io::Result<i32> {
        Ok(exit_code(self.child.wait().await?))
    }

    async fn kill(&mut self) -> io::Result<()> {
        match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}
