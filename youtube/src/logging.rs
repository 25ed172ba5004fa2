//! Log output for a run: console plus an append-only file per target month.

use crate::config::Config;
use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber.
///
/// Every event goes to stdout and is appended to [`Config::log_file_name`] inside
/// [`Config::log_dir`]. Verbosity follows `RUST_LOG` and defaults to `info`.
///
/// The returned guard flushes the file writer when dropped, so keep it alive for the whole run.
pub fn init(config: &Config) -> eyre::Result<WorkerGuard> {
    std::fs::create_dir_all(config.log_dir())
        .with_context(|| format!("create log directory {}", config.log_dir().display()))?;
    let appender = tracing_appender::rolling::never(config.log_dir(), config.log_file_name());
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}
