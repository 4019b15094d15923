//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal actions
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT while draining forces exit
//! - SIGHUP re-reads the config file, it never shuts down

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{reload, ProxyConfig};
use crate::lifecycle::Shutdown;

/// What a received signal asks the process to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Shutdown(&'static str),
    Reload,
}

/// Where SIGHUP reloads come from and go to.
pub struct ReloadSource {
    pub path: PathBuf,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
}

/// Handle signals until the process exits.
#[cfg(unix)]
pub async fn listen(shutdown: Arc<Shutdown>, reload_source: Option<ReloadSource>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        let action = tokio::select! {
            _ = terminate.recv() => SignalAction::Shutdown("SIGTERM"),
            _ = interrupt.recv() => SignalAction::Shutdown("SIGINT"),
            _ = hangup.recv() => SignalAction::Reload,
        };
        apply(action, &shutdown, reload_source.as_ref());
    }
}

/// Handle Ctrl+C until the process exits.
#[cfg(not(unix))]
pub async fn listen(shutdown: Arc<Shutdown>, reload_source: Option<ReloadSource>) -> std::io::Result<()> {
    loop {
        tokio::signal::ctrl_c().await?;
        apply(SignalAction::Shutdown("ctrl-c"), &shutdown, reload_source.as_ref());
    }
}

pub fn apply(action: SignalAction, shutdown: &Shutdown, reload_source: Option<&ReloadSource>) {
    match action {
        SignalAction::Shutdown(signal) => {
            if shutdown.trigger() {
                tracing::info!(signal, "Graceful shutdown requested");
            } else {
                tracing::warn!(signal, "Second shutdown signal, exiting immediately");
                std::process::exit(130);
            }
        }
        SignalAction::Reload => match reload_source {
            Some(source) => reload(&source.path, &source.updates),
            None => tracing::info!("SIGHUP ignored: no config file in use"),
        },
    }
}
