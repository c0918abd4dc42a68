//! Interrupt handling
//!
//! Ctrl-C (and SIGTERM on unix) cancel the pipeline token so the running
//! step winds down and cleanup still happens.

use dqship_client::CancellationToken;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Spawn a task that cancels `cancel` on the first interrupt.
///
/// The task also ends once `cancel` fires for any other reason.
pub fn cancel_on_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = wait_for_interrupt() => {
                match signal {
                    Ok(name) => {
                        warn!(signal = name, "Interrupted, stopping backup");
                        cancel.cancel();
                    }
                    Err(err) => error!(error = %err, "Failed to listen for interrupts"),
                }
            }
        }
    })
}

/// Cancel `cancel` and wait for the handler spawned by [`cancel_on_interrupt`]
pub async fn stop_interrupt_handler(cancel: &CancellationToken, handle: JoinHandle<()>) {
    cancel.cancel();
    if let Err(err) = handle.await {
        warn!(error = %err, "Interrupt handler ended abnormally");
    }
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}
