//! Interrupt handling.
//!
//! The first Ctrl+C (or SIGTERM on Unix) cancels the returned token. Commands
//! and the plugin launcher watch the token and wind down; a child plugin is
//! interrupted and given a grace period before it is killed.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a task that cancels `token` when the process is asked to stop.
///
/// Must be called from within a tokio runtime.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupted() => {
                debug!("Interrupt received, cancelling");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(unix)]
async fn interrupted() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, "Cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn interrupted() {
    let _ = tokio::signal::ctrl_c().await;
}
