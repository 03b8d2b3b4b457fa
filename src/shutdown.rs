//! Cancellation for background refresh tasks.
//!
//! A [`ShutdownCoordinator`] hands out [`ShutdownSignal`]s. Refreshing key
//! sources select on their signal and stop scheduling attempts once it fires.
//! Dropping the coordinator fires every outstanding signal.

use tokio::sync::watch;
use tracing::info;

/// Shutdown coordinator for refresh tasks
#[derive(Debug)]
pub struct ShutdownCoordinator {
    shutdown_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    /// Gets a shutdown receiver
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.shutdown_tx.subscribe(),
        }
    }

    /// Fires the signal for every subscriber
    pub fn shutdown(&self) {
        info!(subscribers = self.shutdown_tx.receiver_count(), "Initiating shutdown");
        self.shutdown_tx.send_replace(true);
    }

    /// Checks whether shutdown was initiated
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Returns the number of live signals
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shutdown_tx.receiver_count()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown signal receiver
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits until shutdown is signaled or the coordinator is dropped
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }

    /// Checks if shutdown has been signaled (non-blocking)
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }
}
