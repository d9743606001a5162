//! Shutdown signal handling.

use tracing::info;

#[cfg(unix)]
mod platform {
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::warn;

    pub async fn wait() -> &'static str {
        tokio::select! {
            () = await_signal(SignalKind::interrupt()) => "SIGINT",
            () = await_signal(SignalKind::terminate()) => "SIGTERM",
        }
    }

    async fn await_signal(kind: SignalKind) {
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, ?kind, "failed to register signal handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
mod platform {
    use tracing::warn;

    pub async fn wait() -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to register CTRL+C handler");
            std::future::pending::<()>().await;
        }
        "CTRL+C"
    }
}

/// Resolves once SIGINT or SIGTERM arrives.
pub async fn shutdown() -> &'static str {
    let signal = platform::wait().await;
    info!(%signal, "received signal, starting shutdown");
    signal
}
