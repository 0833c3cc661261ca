//! Periodic server availability check.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::ChatTransport;

/// Polls the server health endpoint and publishes the latest answer.
///
/// `None` until the first check completes. The polling task stops when the
/// monitor is dropped.
#[derive(Debug)]
pub struct HealthMonitor {
    rx: watch::Receiver<Option<bool>>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling `transport` every `interval`, beginning immediately.
    pub fn start(transport: Arc<dyn ChatTransport>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let healthy = transport.health_check().await;
                let changed = tx.send_if_modified(|current| {
                    let changed = *current != Some(healthy);
                    *current = Some(healthy);
                    changed
                });
                if changed {
                    info!(healthy, "Server availability changed");
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Self { rx, handle }
    }

    /// Latest known availability.
    pub fn status(&self) -> Option<bool> {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.rx.clone()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
