// src/utils/logging.rs
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "swap-wallet.log";

/// Installs the global subscriber: stdout always, plus a non-blocking daily
/// file when `log_dir` is set. Keep the guard alive or buffered lines are lost.
pub fn init(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(Path::new(dir))
                .with_context(|| format!("cannot create log dir {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(std::io::stdout.and(file_writer)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialised: {}", e))?;

    Ok(guard)
}
