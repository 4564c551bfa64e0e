//! Garbage collection of stale dependency-set members
//!
//! Entries that expire naturally stay listed in their dependency sets. A GC
//! pass scans the `deps:` namespace and prunes, one set at a time, members
//! whose entry no longer exists. Sets left empty are kept.

use crate::cache::store::{DependencyStore, ScriptId};
use crate::cache::types::GcReport;
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Shortest interval accepted by [`GarbageCollector::spawn_periodic`]
pub const MIN_GC_INTERVAL: Duration = Duration::from_millis(1);

/// Prunes dependency sets of expired members
#[derive(Clone)]
pub struct GarbageCollector {
    store: Arc<dyn DependencyStore>,
}

impl GarbageCollector {
    pub fn new(store: Arc<dyn DependencyStore>) -> Self {
        Self { store }
    }

    /// Run one pass over every dependency set.
    ///
    /// Each set is pruned atomically; the pass as a whole is not, so members
    /// added concurrently are picked up by a later pass.
    pub async fn collect_garbage(&self) -> Result<GcReport> {
        let started_at = Utc::now();
        let dependency_keys = self.store.scan_dependency_keys().await?;

        let mut members_pruned = 0;
        for dependency_key in &dependency_keys {
            let pruned = self
                .store
                .run_atomic(
                    ScriptId::CollectGarbage,
                    std::slice::from_ref(dependency_key),
                    &[],
                )
                .await?;
            if !pruned.is_empty() {
                debug!("Pruned {} stale members from {}", pruned.len(), dependency_key);
            }
            members_pruned += pruned.len();
        }

        let report = GcReport {
            sets_scanned: dependency_keys.len(),
            members_pruned,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Garbage collection scanned {} dependency sets, pruned {} members in {}ms",
            report.sets_scanned,
            report.members_pruned,
            report.duration().as_millis()
        );

        Ok(report)
    }

    /// Run a pass every `interval` on the tokio runtime until the handle is shut down.
    ///
    /// The first pass runs one interval after spawning. A failed pass is
    /// logged and the loop continues. Intervals shorter than
    /// [`MIN_GC_INTERVAL`] are raised to it.
    pub fn spawn_periodic(&self, interval: Duration) -> GcHandle {
        let interval = if interval < MIN_GC_INTERVAL {
            warn!(
                "Garbage collection interval {:?} raised to {:?}",
                interval, MIN_GC_INTERVAL
            );
            MIN_GC_INTERVAL
        } else {
            interval
        };
        let collector = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately on the first tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Background garbage collection stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = collector.collect_garbage().await {
                            error!("Background garbage collection failed: {}", e);
                        }
                    }
                }
            }
        });

        info!("Started background garbage collection every {:?}", interval);

        GcHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a background garbage-collection task
pub struct GcHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GcHandle {
    /// Stop the task and wait for an in-flight pass to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
