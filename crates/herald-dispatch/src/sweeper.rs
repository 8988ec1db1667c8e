//! Background sweep of expired cooldowns.
//!
//! Expired entries are already ignored on read; sweeping only bounds the
//! memory held by keys that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::registry::Registry;

/// Periodically removes expired cooldown entries from a registry.
pub struct CooldownSweeper {
    registry: Arc<Registry>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl CooldownSweeper {
    pub fn new(registry: Arc<Registry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Sweep every `interval` until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    let removed = self.registry.sweep_expired_cooldowns();
                    if removed > 0 {
                        debug!(removed, "Swept expired cooldowns");
                    }
                }
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// Signal the sweeper to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
