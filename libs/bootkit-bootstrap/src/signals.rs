use anyhow::Result;
use tokio::signal;

/// Wait for termination signals (Ctrl+C / SIGINT, SIGTERM).
pub async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(%e, "Failed to install Ctrl+C handler");
            return Err(e);
        }
        Ok(())
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                handler.recv().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(%e, "Failed to install SIGTERM handler");
                Err(e)
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = async { Ok::<(), std::io::Error>(()) };

    tokio::select! {
        result = ctrl_c => {
            result.map(|_| tracing::info!("Received Ctrl+C signal"))?;
        },
        result = terminate => {
            result.map(|_| tracing::info!("Received SIGTERM signal"))?;
        },
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}
