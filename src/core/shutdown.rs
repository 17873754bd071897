//! # Cross-platform OS signal handling.
//!
//! On hosted targets the supervision loop also ends when the process receives a
//! termination signal.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`. **Other platforms:** `Ctrl-C`.

use tracing::warn;

/// Completes when a termination signal arrives.
///
/// If the signal handlers cannot be installed the future never completes, so the
/// supervisor keeps running instead of shutting down immediately.
pub async fn wait_for_shutdown_signal() {
    if let Err(e) = listen().await {
        warn!(target: "initvisor::supervisor", error = %e, "signal handlers unavailable; shutdown only via restart");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn listen() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn listen() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
