//! Scripted stand-in for a Vivado child, for unit tests.
//!
//! The fake child understands just enough of the session protocol: it prints
//! a banner with the prompt, recognizes wrapped command blocks on stdin,
//! answers them through a responder closure, and honors `exit`. Batch-mode
//! spawns print canned output and exit with a canned code.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{ProcessControl, ProcessSpawner, ShellProcess, SpawnRequest, OUTPUT_CHANNEL_CAPACITY};
use crate::session::{COMPLETION_MARKER, ERROR_MARKER, PROMPT};

const BLOCK_START: &str = "if {[catch {";
const BLOCK_COMMAND_END: &str = "} result]} {";

/// How the fake child answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Print the text, then the completion marker.
    Ok(String),
    /// Print the text, then the error marker.
    Err(String),
    /// Print the text verbatim, markers included if wanted.
    Raw(String),
    /// Like `Ok`, after sleeping first.
    Delayed(Duration, String),
    /// Print nothing and keep running.
    Silent,
    /// Exit with status 1 without answering.
    Crash,
}

/// Startup behavior of an interactive child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// Print the banner and the prompt.
    Ready,
    /// Print nothing, ever.
    Hang,
    /// Print a license error and exit.
    Exit,
}

type Responder = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

/// Behavior of every child a [`ScriptedSpawner`] launches.
#[derive(Clone)]
pub struct Script {
    banner: String,
    after_prompt: Option<String>,
    responder: Responder,
    honor_exit: bool,
    startup: Startup,
    chunk_size: usize,
    batch_output: String,
    batch_exit_code: i32,
    batch_hang: bool,
}

impl Script {
    /// A well-behaved Vivado 2023.2 that echoes every command back.
    pub fn vivado() -> Self {
        Self {
            banner: format!(
                "\n****** Vivado v2023.2 (64-bit)\n  **** SW Build 4029153\n\n{} ",
                PROMPT
            ),
            after_prompt: None,
            responder: Arc::new(|cmd| Reply::Ok(cmd.to_string())),
            honor_exit: true,
            startup: Startup::Ready,
            chunk_size: 4096,
            batch_output: String::new(),
            batch_exit_code: 0,
            batch_hang: false,
        }
    }

    /// Answer commands with `responder`.
    pub fn respond<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    /// Print `text` in its own chunk right after the first prompt.
    pub fn after_prompt(mut self, text: &str) -> Self {
        self.after_prompt = Some(text.to_string());
        self
    }

    /// Keep running after `exit`.
    pub fn ignore_exit(mut self) -> Self {
        self.honor_exit = false;
        self
    }

    /// Choose what happens before the first prompt.
    pub fn startup(mut self, startup: Startup) -> Self {
        self.startup = startup;
        self
    }

    /// Deliver output in chunks of at most `size` bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Output and exit code of batch-mode runs.
    pub fn batch(mut self, output: &str, exit_code: i32) -> Self {
        self.batch_output = output.to_string();
        self.batch_exit_code = exit_code;
        self
    }

    /// Batch-mode runs never finish.
    pub fn hang_in_batch(mut self) -> Self {
        self.batch_hang = true;
        self
    }
}

/// Spawner that launches scripted children and records what it was asked.
pub struct ScriptedSpawner {
    script: Script,
    fail_with: Option<io::ErrorKind>,
    spawns: AtomicUsize,
    kills: Arc<AtomicUsize>,
    requests: Mutex<Vec<SpawnRequest>>,
    batch_scripts: Mutex<Vec<String>>,
}

impl ScriptedSpawner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            fail_with: None,
            spawns: AtomicUsize::new(0),
            kills: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            batch_scripts: Mutex::new(Vec::new()),
        }
    }

    /// Spawner whose every spawn fails with `kind`.
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::new(Script::vivado())
        }
    }

    /// Number of spawn attempts.
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Number of children force-killed while still running.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Every request seen, in order.
    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Contents of the `-source` scripts of batch runs, read at spawn time.
    pub fn batch_scripts(&self) -> Vec<String> {
        self.batch_scripts.lock().unwrap().clone()
    }
}

impl ProcessSpawner for ScriptedSpawner {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<ShellProcess> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(kind) = self.fail_with {
            return Err(io::Error::from(kind));
        }

        let (stdin, child_stdin) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let exit = Arc::new(watch::channel(None).0);
        let script = self.script.clone();

        let source = request
            .args
            .iter()
            .position(|arg| arg == "-source")
            .and_then(|i| request.args.get(i + 1));

        let task = match source {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                self.batch_scripts.lock().unwrap().push(contents);
                tokio::spawn(run(
                    batch(script, tx.clone()),
                    exit.clone(),
                    (tx, child_stdin),
                ))
            }
            None => tokio::spawn(run(
                interactive(script, child_stdin, tx.clone()),
                exit.clone(),
                tx,
            )),
        };

        Ok(ShellProcess {
            stdin: Box::new(stdin),
            output: rx,
            control: Box::new(MockControl {
                exit,
                task,
                kills: self.kills.clone(),
            }),
        })
    }
}

/// Run the child body, publish its exit code, then release `held`
/// (the child's ends of its pipes).
async fn run<F, H>(body: F, exit: Arc<watch::Sender<Option<i32>>>, held: H)
where
    F: std::future::Future<Output = i32>,
{
    let code = body.await;
    exit.send_replace(Some(code));
    drop(held);
}

async fn send(tx: &mpsc::Sender<Vec<u8>>, text: &str, chunk_size: usize) {
    for chunk in text.as_bytes().chunks(chunk_size) {
        if tx.send(chunk.to_vec()).await.is_err() {
            return;
        }
    }
}

fn extract_command(block: &str) -> &str {
    let body = block.strip_prefix(BLOCK_START).unwrap_or(block);
    body.split(BLOCK_COMMAND_END).next().unwrap_or(body)
}

async fn interactive(script: Script, stdin: DuplexStream, tx: mpsc::Sender<Vec<u8>>) -> i32 {
    match script.startup {
        Startup::Hang => return std::future::pending().await,
        Startup::Exit => {
            send(&tx, "ERROR: [Common 17-345] A valid license was not found\n", script.chunk_size)
                .await;
            return 1;
        }
        Startup::Ready => {
            send(&tx, &script.banner, script.chunk_size).await;
            if let Some(tail) = &script.after_prompt {
                send(&tx, tail, script.chunk_size).await;
            }
        }
    }

    let mut lines = BufReader::new(stdin).lines();
    let mut block: Option<Vec<String>> = None;

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(buf) = block.as_mut() {
            let done = line == "}";
            buf.push(line);
            if !done {
                continue;
            }
            let body = buf.join("\n");
            block = None;

            let text = match (script.responder)(extract_command(&body)) {
                Reply::Ok(out) if out.is_empty() => format!("{}\n{} ", COMPLETION_MARKER, PROMPT),
                Reply::Ok(out) => format!("{}\n{}\n{} ", out, COMPLETION_MARKER, PROMPT),
                Reply::Err(out) => format!("{}\n{}\n{} ", out, ERROR_MARKER, PROMPT),
                Reply::Delayed(delay, out) => {
                    tokio::time::sleep(delay).await;
                    format!("{}\n{}\n{} ", out, COMPLETION_MARKER, PROMPT)
                }
                Reply::Raw(out) => out,
                Reply::Silent => continue,
                Reply::Crash => return 1,
            };
            send(&tx, &text, script.chunk_size).await;
        } else if line.starts_with(BLOCK_START) {
            block = Some(vec![line]);
        } else if line.trim() == "exit" && script.honor_exit {
            return 0;
        }
    }

    0
}

async fn batch(script: Script, tx: mpsc::Sender<Vec<u8>>) -> i32 {
    if script.batch_hang {
        return std::future::pending().await;
    }
    send(&tx, &script.batch_output, script.chunk_size).await;
    script.batch_exit_code
}

struct MockControl {
    exit: Arc<watch::Sender<Option<i32>>>,
    task: JoinHandle<()>,
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl ProcessControl for MockControl {
    fn id(&self) -> Option<u32> {
        None
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(*self.exit.borrow())
    }

    async fn wait(&mut self) -> io::Result<i32> {
        let mut rx = self.exit.subscribe();
        let code = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok((*code).unwrap_or(-1))
    }

    async fn kill(&mut self) -> io::Result<()> {
        if self.exit.borrow().is_some() {
            return Ok(());
        }
        self.task.abort();
        self.exit.send_replace(Some(-1));
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn read_until(output: &mut crate::process::OutputReceiver, needle: &str) -> String {
        let mut text = String::new();
        while !text.contains(needle) {
            match output.recv().await {
                Some(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                None => break,
            }
        }
        text
    }

    #[tokio::test]
    async fn test_banner_and_reply() {
        let spawner = ScriptedSpawner::new(Script::vivado().chunk_size(3));
        let mut child = spawner.spawn(&SpawnRequest::new("vivado")).unwrap();

        let banner = read_until(&mut child.output, &format!("{} ", PROMPT)).await;
        assert!(banner.contains("Vivado v2023.2"));

        let wrapped = crate::session::wrap_command("puts hi");
        child.stdin.write_all(wrapped.as_bytes()).await.unwrap();
        child.stdin.flush().await.unwrap();

        let reply = read_until(&mut child.output, COMPLETION_MARKER).await;
        assert!(reply.starts_with("puts hi\n"));
    }

    #[tokio::test]
    async fn test_exit_and_kill() {
        let spawner = ScriptedSpawner::new(Script::vivado());
        let mut child = spawner.spawn(&SpawnRequest::new("vivado")).unwrap();
        read_until(&mut child.output, PROMPT).await;

        child.stdin.write_all(b"exit\n").await.unwrap();
        assert_eq!(child.control.wait().await.unwrap(), 0);
        assert_eq!(child.control.try_wait().unwrap(), Some(0));

        // Killing an exited child is a no-op.
        child.control.kill().await.unwrap();
        assert_eq!(spawner.kill_count(), 0);
    }

    #[tokio::test]
    async fn test_kill_hung_child() {
        let spawner = ScriptedSpawner::new(Script::vivado().startup(Startup::Hang));
        let mut child = spawner.spawn(&SpawnRequest::new("vivado")).unwrap();

        assert_eq!(child.control.try_wait().unwrap(), None);
        child.control.kill().await.unwrap();
        assert_eq!(child.control.try_wait().unwrap(), Some(-1));
        assert_eq!(spawner.kill_count(), 1);
        // Output closes once the aborted task is dropped.
        assert!(child.output.recv().await.is_none());
    }

    #[test]
    fn test_extract_command() {
        let block = "if {[catch {expr 2+2} result]} {\n    puts $result";
        assert_eq!(extract_command(block), "expr 2+2");
    }
}
