//! Tabmux - Terminal Session Multiplexer
//!
//! CLI entry point. `serve` speaks JSON lines on stdin/stdout, so every log
//! line goes to stderr or to the configured log directory.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bridge;
mod cli;
mod server;

use server::config::LoggingConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = server::load_config(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging)?;

    if matches!(cli.command, Some(cli::Commands::Serve { .. })) {
        info!("Starting Tabmux v{}", env!("CARGO_PKG_VERSION"));
    }

    cli::run(cli, config).await
}

/// Install the stderr layer plus an optional daily-rolling file layer.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, &logging.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
