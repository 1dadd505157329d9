//! Cooperative shutdown signalling
//!
//! [`shutdown_channel`] returns a single [`ShutdownTrigger`] owned by the
//! process entry point and a cloneable [`Shutdown`] listener handed to the
//! engine. Triggering is idempotent and observed by every clone.

use tokio::sync::watch;

/// Create a linked trigger/listener pair
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Requests shutdown
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every listener
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes a shutdown request
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested
    ///
    /// A dropped trigger counts as a request.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown is requested
    ///
    /// Also resolves if the trigger is dropped, so a lost trigger cannot
    /// leave the engine running forever.
    pub async fn wait(&mut self) {
        // Err means the sender is gone, which counts as shutdown too.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_seen_by_clones() {
        let (trigger, shutdown) = shutdown_channel();
        let mut other = shutdown.clone();
        assert!(!shutdown.is_triggered());

        trigger.trigger();
        assert!(shutdown.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), other.wait())
            .await
            .expect("wait resolves after trigger");
    }

    #[tokio::test]
    async fn dropped_trigger_releases_waiters() {
        let (trigger, mut shutdown) = shutdown_channel();
        drop(trigger);
        assert!(shutdown.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .expect("wait resolves when trigger is dropped");
    }
}
