//! File-only tracing setup. The viewer owns the terminal, so nothing is ever
//! written to stdout or stderr by the subscriber.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber writing to `log_file`, filtered by `RUST_LOG`
/// (default `info`). Returns `None` and installs nothing without a file.
///
/// Keep the guard alive until exit; dropping it flushes the writer.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(path) = log_file else {
        return Ok(None);
    };
    let file =
        File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter)
        .try_init()
        .context("tracing subscriber already installed")?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(Some(guard))
}
