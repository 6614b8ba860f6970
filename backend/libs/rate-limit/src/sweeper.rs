use crate::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Owns the background sweep task. Dropping the handle stops the task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        self.handle.abort();
    }
}

/// Clear `limiter` every `interval` until the returned handle is dropped.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(async move {
        sweep_loop(limiter, interval, shutdown_rx).await;
    });

    SweeperHandle {
        shutdown_tx,
        handle,
    }
}

async fn sweep_loop(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Rate limit sweeper shutting down");
                break;
            }
            _ = sleep(interval) => {
                let cleared = limiter.clear();
                if cleared > 0 {
                    info!(cleared, "Rate limit buckets swept");
                } else {
                    debug!("Rate limit sweep found no buckets");
                }
            }
        }
    }
}
