//! One-shot batch invocation.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::result::CommandResult;
use crate::error::{Result, VivadoError};
use crate::install::Installation;
use crate::output::{parse_tool_output, TextAccumulator};
use crate::process::{deadline_after, ProcessSpawner, ShellProcess, SpawnRequest};
use crate::session::batch_args;

/// Run `command` in a fresh `vivado -mode batch` process.
///
/// The command is written to a temporary `vivado_cmd_*.tcl` script followed
/// by `exit`. Nothing is shared between calls, so this is slow (Vivado
/// starts from scratch each time) but needs no session.
pub async fn run_batch_command(
    spawner: &dyn ProcessSpawner,
    installation: Option<&Installation>,
    command: &str,
    timeout: Duration,
) -> CommandResult {
    let Some(installation) = installation else {
        return CommandResult::failure(command, VivadoError::NoInstallation.to_string());
    };

    let started = Instant::now();
    match run(spawner, installation, command, timeout).await {
        Ok(result) => result.with_duration(started.elapsed()),
        Err(e) => {
            warn!("Batch command failed: {}", e);
            CommandResult::failure(command, e.to_string())
        }
    }
}

fn write_script(command: &str) -> std::io::Result<NamedTempFile> {
    let mut script = tempfile::Builder::new()
        .prefix("vivado_cmd_")
        .suffix(".tcl")
        .tempfile()?;
    write!(script, "{}\nexit\n", command)?;
    script.flush()?;
    Ok(script)
}

async fn run(
    spawner: &dyn ProcessSpawner,
    installation: &Installation,
    command: &str,
    timeout: Duration,
) -> Result<CommandResult> {
    // Removed from disk when dropped, after the child is gone.
    let script = write_script(command)?;

    let request = SpawnRequest::new(installation.executable.clone())
        .args(batch_args(script.path()));
    debug!("Running batch command via {}", script.path().display());

    let ShellProcess {
        stdin,
        mut output,
        mut control,
    } = spawner.spawn(&request).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            VivadoError::ExecutableNotFound(installation.executable.clone())
        }
        _ => VivadoError::Spawn(e),
    })?;
    drop(stdin);

    let deadline = deadline_after(Instant::now(), timeout);
    let finished = timeout_at(deadline, async {
        let mut text = TextAccumulator::new();
        while let Some(chunk) = output.recv().await {
            text.push(&chunk);
        }
        let code = control.wait().await?;
        Ok::<_, std::io::Error>((text.into_text(), code))
    })
    .await;

    match finished {
        Ok(Ok((text, code))) => {
            debug!("Batch Vivado exited with code {}", code);
            Ok(CommandResult::new(command, text.trim(), code == 0)
                .with_messages(parse_tool_output(&text)))
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            if let Err(e) = control.kill().await {
                warn!("Failed to kill timed-out batch process: {}", e);
            }
            Err(VivadoError::CommandTimeout(timeout))
        }
    }
}
