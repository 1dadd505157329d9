//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Collecting the external IPs of ready nodes for each target
//! - Reconciling each target's address records through the DnsProvider
//! - Isolating failures so one broken target never stalls the others
//! - Stopping promptly when shutdown is requested
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   interval ───▶ │  SyncEngine  │ ◀─── Shutdown
//!                 └──────────────┘
//!                        │ per target
//!         ┌──────────────┼──────────────────────┐
//!         ▼              ▼                      ▼
//! ┌───────────────┐ ┌─────────────┐      ┌─────────────┐
//! │ NodeAddress   │ │ Reconciler  │      │   Events    │
//! │ Collector     │ │ (DnsProvider)│     │  (notify)   │
//! └───────────────┘ └─────────────┘      └─────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. For each target, in configuration order:
//!    collect addresses, then reconcile
//! 2. A failed target is logged and reported; the tick moves on
//! 3. Wait for the interval or shutdown, whichever comes first
//!
//! The interval is the only retry mechanism. A tick that is already
//! talking to a provider finishes its current target before stopping.

use crate::collector::NodeAddressCollector;
use crate::config::{DnsTarget, SyncConfig};
use crate::duration::format_duration;
use crate::error::Result;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::shutdown::Shutdown;
use crate::traits::{DnsProvider, NodeLister};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Capacity of the bounded event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { targets_count: usize },

    /// A polling tick began
    TickStarted,

    /// A target was reconciled
    TargetSynced {
        hostname: String,
        deleted: usize,
        created: usize,
    },

    /// A target failed this tick
    TargetFailed { hostname: String, error: String },

    /// A polling tick finished, possibly cut short by shutdown
    TickCompleted { synced: usize, failed: usize },

    /// Engine stopped
    Stopped { reason: String },
}

/// Outcome counts for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub synced: usize,
    pub failed: usize,
}

/// Polling DNS sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::spawn()`] (or await [`SyncEngine::run()`])
/// 3. Trigger the paired [`ShutdownTrigger`](crate::ShutdownTrigger)
/// 4. Await [`EngineHandle::wait()`]
///
/// ## Load Resistance
///
/// Events go through a bounded channel. When it is full, events are
/// dropped with a warning rather than blocking the sync loop.
pub struct SyncEngine {
    collector: NodeAddressCollector,
    reconciler: Reconciler,
    targets: Vec<DnsTarget>,
    interval: Duration,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(
        lister: Arc<dyn NodeLister>,
        provider: Arc<dyn DnsProvider>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            collector: NodeAddressCollector::new(lister),
            reconciler: Reconciler::new(provider).with_dry_run(config.dry_run),
            targets: config.targets.clone(),
            interval: config.interval,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Collect and reconcile a single target
    pub async fn sync_target(&self, target: &DnsTarget) -> Result<ReconcileOutcome> {
        let result = match self.collector.collect(&target.label_selector).await {
            Ok(desired) => self.reconciler.reconcile(target, &desired).await,
            Err(e) => Err(e),
        };
        result.map_err(|e| e.context(format!("failed to sync {}", target.fqdn())))
    }

    /// Run one tick over every target
    ///
    /// Checks `shutdown` before each target and stops early once it is
    /// triggered. Target failures are reported, never returned.
    pub async fn run_once(&self, shutdown: &Shutdown) -> TickSummary {
        self.emit_event(EngineEvent::TickStarted);
        let mut summary = TickSummary::default();

        for target in &self.targets {
            if shutdown.is_triggered() {
                debug!("Shutdown requested, skipping remaining targets");
                break;
            }

            match self.sync_target(target).await {
                Ok(outcome) => {
                    summary.synced += 1;
                    self.emit_event(EngineEvent::TargetSynced {
                        hostname: target.hostname.clone(),
                        deleted: outcome.deleted,
                        created: outcome.created,
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(hostname = %target.hostname, error = %e, "Failed to sync DNS records");
                    self.emit_event(EngineEvent::TargetFailed {
                        hostname: target.hostname.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.emit_event(EngineEvent::TickCompleted {
            synced: summary.synced,
            failed: summary.failed,
        });
        summary
    }

    /// Run the polling loop until `shutdown` is triggered
    ///
    /// The first tick starts immediately.
    pub async fn run(&self, mut shutdown: Shutdown) {
        info!(
            targets = self.targets.len(),
            interval = %format_duration(self.interval),
            "Starting DNS sync loop"
        );
        self.emit_event(EngineEvent::Started {
            targets_count: self.targets.len(),
        });

        while !shutdown.is_triggered() {
            self.run_once(&shutdown).await;

            tokio::select! {
                _ = shutdown.wait() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Shutdown signal received, sync loop stopped");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
    }

    /// Run the loop on a new task
    ///
    /// The returned handle resolves once the loop has fully stopped.
    pub fn spawn(self, shutdown: Shutdown) -> EngineHandle {
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            self.run(shutdown).await;
            // Receiver may already be gone; nothing else to notify.
            let _ = done_tx.send(());
        });
        EngineHandle { done: done_rx }
    }

    fn emit_event(&self, event: EngineEvent) {
        // Backpressure: drop rather than block the loop
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Completion marker for a spawned engine
#[derive(Debug)]
pub struct EngineHandle {
    done: oneshot::Receiver<()>,
}

impl EngineHandle {
    /// Wait until the engine has stopped
    ///
    /// Also returns if the engine task ended abnormally.
    pub async fn wait(self) {
        if self.done.await.is_err() {
            warn!("Sync engine task ended without signalling completion");
        }
    }

    /// Wait at most `timeout` for the engine to stop
    ///
    /// Returns `false` if the timeout elapsed first.
    pub async fn wait_timeout(self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::TargetSynced {
            hostname: "nodes.example.com".to_string(),
            deleted: 1,
            created: 2,
        };
        assert_eq!(event.clone(), event);
        assert_ne!(event, EngineEvent::TickStarted);
    }

    #[tokio::test]
    async fn test_dropped_engine_task_releases_handle() {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        drop(done_tx);
        let handle = EngineHandle { done: done_rx };
        assert!(handle.wait_timeout(Duration::from_secs(1)).await);
    }
}
