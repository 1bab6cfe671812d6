use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::clock::Clock;
use crate::db::{StoreError, WalletStore};
use crate::feed::PositionSource;
use crate::services::classification::ClassificationEngine;
use crate::services::discovery::DiscoveryEngine;
use crate::services::seed_list::SeedList;

/// Work done by one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub discovered: usize,
    pub classified: usize,
}

/// Broadcast after a refresh cycle that created wallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshEvent {
    pub discovered: usize,
    pub classified: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub wallets_deleted: usize,
    pub wallets_reclassified: usize,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub inactive_after_days: u32,
    /// 0 disables stale re-classification.
    pub stale_after_hours: u32,
    pub stale_limit: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            inactive_after_days: 30,
            stale_after_hours: 24,
            stale_limit: 50,
        }
    }
}

/// Runs discovery then classification as one cycle. At most one cycle (or
/// maintenance pass) is in flight; overlapping callers wait their turn.
pub struct Orchestrator<P, S, C> {
    discovery: DiscoveryEngine<P, S, C>,
    classification: ClassificationEngine<P, S, C>,
    store: Arc<S>,
    clock: Arc<C>,
    events: broadcast::Sender<RefreshEvent>,
    cycle_lock: Mutex<()>,
}

impl<P, S, C> Orchestrator<P, S, C>
where
    P: PositionSource,
    S: WalletStore,
    C: Clock,
{
    pub fn new(
        source: Arc<P>,
        store: Arc<S>,
        clock: Arc<C>,
        seeds: SeedList,
        events: broadcast::Sender<RefreshEvent>,
    ) -> Self {
        Self {
            discovery: DiscoveryEngine::new(source.clone(), store.clone(), clock.clone(), seeds),
            classification: ClassificationEngine::new(source, store.clone(), clock.clone()),
            store,
            clock,
            events,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.discovery = self.discovery.with_batch_size(batch_size);
        self
    }

    pub fn discovery(&self) -> &DiscoveryEngine<P, S, C> {
        &self.discovery
    }

    pub fn classification(&self) -> &ClassificationEngine<P, S, C> {
        &self.classification
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// Discover, then classify exactly the wallets created in this cycle.
    ///
    /// Emits a [`RefreshEvent`] only when wallets were created. Errors other
    /// than an unavailable store are absorbed by the engines.
    pub async fn run_refresh_cycle(&self) -> Result<RefreshSummary, StoreError> {
        let _cycle = self.cycle_lock.lock().await;
        let started = Instant::now();

        let discovery = self.discovery.discover().await?;

        if discovery.wallets_created == 0 {
            tracing::info!(
                addresses = discovery.addresses_discovered,
                "Refresh cycle: no new wallets"
            );
            metrics::histogram!("refresh_cycle_seconds").record(started.elapsed().as_secs_f64());
            return Ok(RefreshSummary::default());
        }

        // Reuse the discovery snapshot; refetch only if discovery had none.
        let classified = match &discovery.positions {
            Some(positions) => {
                self.classification
                    .classify_batch_with(&discovery.created_addresses, positions)
                    .await?
            }
            None => {
                self.classification
                    .classify_batch(&discovery.created_addresses)
                    .await?
            }
        };

        let summary = RefreshSummary {
            discovered: discovery.wallets_created,
            classified,
        };

        let event = RefreshEvent {
            discovered: summary.discovered,
            classified: summary.classified,
            completed_at: self.clock.now(),
        };
        if self.events.send(event).is_err() {
            tracing::debug!("Refresh event dropped: no subscribers");
        }

        metrics::histogram!("refresh_cycle_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            discovered = summary.discovered,
            classified = summary.classified,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh cycle complete"
        );

        Ok(summary)
    }

    /// Sweep inactive wallets and re-classify stale ones.
    pub async fn run_maintenance(
        &self,
        config: &MaintenanceConfig,
    ) -> Result<MaintenanceReport, StoreError> {
        let _cycle = self.cycle_lock.lock().await;

        let wallets_deleted = match self
            .store
            .delete_inactive(config.inactive_after_days, self.clock.now())
            .await
        {
            Ok(n) => n,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Inactivity sweep failed");
                0
            }
        };

        let wallets_reclassified = if config.stale_after_hours == 0 {
            0
        } else {
            let max_age = chrono::Duration::hours(i64::from(config.stale_after_hours));
            match self.classification.classify_stale(max_age, config.stale_limit).await {
                Ok(n) => n,
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Stale re-classification failed");
                    0
                }
            }
        };

        if let Ok(total) = self.store.count().await {
            metrics::gauge!("tracked_wallets").set(total as f64);
        }

        tracing::info!(
            deleted = wallets_deleted,
            reclassified = wallets_reclassified,
            inactive_after_days = config.inactive_after_days,
            "Maintenance pass complete"
        );

        Ok(MaintenanceReport {
            wallets_deleted,
            wallets_reclassified,
        })
    }
}
