//! Server module for Tabmux
//!
//! Runs the session controller behind the stdio bridge and feeds it
//! configuration reloads and shutdown signals.

pub mod config;
pub mod loader;

pub use loader::load_config;

use crate::bridge;
use anyhow::{Context, Result};
use self::config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tabmux_core::{Controller, ControllerHandle, FirstRootPicker, InboundMessage, PtyBackend};
use tracing::{info, warn};

/// Options of the `serve` command
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Configuration file to re-read on reload
    pub config_path: Option<PathBuf>,
    /// Start the first session at this size without waiting for `ready`
    pub initial_size: Option<(u16, u16)>,
}

/// Run the controller until stdin closes or a shutdown signal arrives.
pub async fn run(config: AppConfig, options: ServeOptions) -> Result<()> {
    let (controller, handle, outbound) = Controller::new(
        config.core(),
        Arc::new(PtyBackend),
        Arc::new(FirstRootPicker),
    );
    let controller_task = tokio::spawn(controller.run());
    info!(
        program = %config.terminal.launch.program,
        roots = config.workspace.roots.len(),
        "Controller running"
    );

    if let Some((cols, rows)) = options.initial_size {
        handle.send(InboundMessage::Ready { cols, rows })?;
    }

    let reload_task = tokio::spawn(reload_on_hangup(handle.clone(), options.config_path));

    tokio::select! {
        result = bridge::run(tokio::io::stdin(), tokio::io::stdout(), handle.clone(), outbound) => {
            result.context("Bridge failed")?;
        }
        _ = wait_for_shutdown_signal() => {
            let _ = handle.shutdown();
        }
    }

    reload_task.abort();
    controller_task.await.context("Controller task panicked")?;
    info!("Tabmux stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}

/// Re-read configuration on SIGHUP and hand it to the controller.
///
/// Running processes keep their launch settings; the new values apply to the
/// next spawn or restart.
#[cfg(unix)]
async fn reload_on_hangup(handle: ControllerHandle, config_path: Option<PathBuf>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match load_config(config_path.as_deref()) {
            Ok(config) => {
                info!("Configuration reloaded");
                if handle.apply_config(config.core()).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Configuration reload failed, keeping current settings"),
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_handle: ControllerHandle, _config_path: Option<PathBuf>) {}
