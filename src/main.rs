//! vivado-shell binary entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use vivado_shell::cli::{self, Args};
use vivado_shell::{
    build_status, logging, Config, Detector, SessionRegistry, TclSession, TokioSpawner,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'vivado-shell --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_with_filter(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }
    info!("vivado-shell v{}", env!("CARGO_PKG_VERSION"));

    if let Some(project) = &args.status {
        print_json(&build_status(project));
        return ExitCode::SUCCESS;
    }

    let detector = Arc::new(Detector::from_config(&config));

    if args.detect {
        let installations = detector.detect_all();
        info!("Found {} installation(s)", installations.len());
        print_json(&installations);
        return ExitCode::SUCCESS;
    }

    let registry = SessionRegistry::new(
        Arc::new(TokioSpawner::new()),
        detector,
        config.session_timeouts(),
    );
    let timeout = config.command_timeout();

    let ok = if args.batch {
        run_batch(&registry, &args, timeout).await
    } else if !args.exec.is_empty() {
        run_exec(&registry, &args, timeout).await
    } else {
        run_repl(&registry, &args, timeout).await
    };

    for (id, outcome) in registry.close_all().await {
        if !outcome.success {
            warn!("Closing {}: {}", id, outcome.message);
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: failed to serialize output: {}", e),
    }
}

/// One-shot runs. The registry is empty, so every command falls back.
async fn run_batch(registry: &SessionRegistry, args: &Args, timeout: Duration) -> bool {
    let mut ok = true;
    for command in &args.exec {
        let result = registry
            .run_command_with_fallback(command, None, None, timeout)
            .await;
        ok &= result.success;
        print_json(&result);
    }
    ok
}

async fn start_session(registry: &SessionRegistry, args: &Args) -> Option<Arc<TclSession>> {
    let (session, outcome) = registry.create(None, args.workdir.clone(), true).await;
    if outcome.success {
        info!("{}", outcome.message);
        Some(session)
    } else {
        print_json(&outcome);
        None
    }
}

async fn run_exec(registry: &SessionRegistry, args: &Args, timeout: Duration) -> bool {
    let Some(session) = start_session(registry, args).await else {
        return false;
    };

    let mut ok = true;
    for command in &args.exec {
        let result = session.execute(command, timeout).await;
        ok &= result.success;
        print_json(&result);
    }
    ok
}

/// Read TCL commands from stdin, one per line, until EOF or Ctrl-C.
async fn run_repl(registry: &SessionRegistry, args: &Args, timeout: Duration) -> bool {
    let Some(session) = start_session(registry, args).await else {
        return false;
    };
    eprintln!("Session {} ready. Enter TCL commands, Ctrl-D to quit.", session.id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        let command = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        let command = command.trim();
        if command.is_empty() {
            continue;
        }

        print_json(&session.execute(command, timeout).await);
    }

    true
}
