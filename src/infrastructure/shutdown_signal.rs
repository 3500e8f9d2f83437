use log::info;
use tokio_util::sync::CancellationToken;

use crate::StdResult;

/// Listens for the process stop signals: Ctrl-C everywhere and `SIGTERM` on unix.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Installs the signal handlers. Must be called from within a tokio runtime.
    pub fn register() -> StdResult<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    async fn terminated(&mut self) {
        self.terminate.recv().await;
    }

    #[cfg(not(unix))]
    async fn terminated(&mut self) {
        std::future::pending::<()>().await
    }

    /// Cancels the shutdown token once a stop signal is received.
    ///
    /// Returns without waiting further if the token gets cancelled by someone else.
    pub async fn cancel_on_signal(mut self, shutdown: CancellationToken) -> StdResult<()> {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = self.terminated() => info!("Received SIGTERM, shutting down"),
        }
        shutdown.cancel();

        Ok(())
    }
}
