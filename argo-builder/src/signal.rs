//! Shutdown signals
//!
//! SIGINT and SIGTERM cancel the in-flight run instead of killing the
//! process, so the terminal callback still goes out.

use argo_core::cancel::CancelHandle;
use tracing::{error, info};

/// Spawns a task that cancels the run on SIGINT or SIGTERM
pub fn cancel_on_shutdown(handle: CancelHandle) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), cancelling build run");
            }
            _ = terminate => {
                info!("Received SIGTERM, cancelling build run");
            }
        }

        handle.cancel();
    });
}
