//! Logging initialization and configuration.
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a configured level is present.
pub const DEFAULT_FILTER: &str = "vivado_shell=info";

fn filter_from(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) if !level.is_empty() => EnvFilter::try_new(level)
            .or_else(|_| EnvFilter::try_new(format!("vivado_shell={}", level)))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Try to initialize the logging system with an explicit filter.
///
/// `level` may be a bare level (`debug`) or a full filter directive
/// (`vivado_shell=trace,tokio=warn`). Returns `Err` if logging has already
/// been initialized.
pub fn init_with_filter(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter_from(Some(level)))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter_from(None))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
