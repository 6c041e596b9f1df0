use tracing::debug;

/// A future that resolves when the process receives a shutdown signal
/// (SIGINT or SIGTERM).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Creates a new shutdown signal listener.
    pub const fn new() -> Self {
        Self
    }

    /// Waits until the next shutdown signal is delivered to the process.
    pub async fn wait(self) {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => debug!("Received SIGINT"),
            () = terminate => debug!("Received SIGTERM"),
        }
    }
}
