use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::clock::Clock;
use crate::db::WalletStore;
use crate::feed::PositionSource;
use crate::services::orchestrator::{MaintenanceConfig, Orchestrator};

/// On-demand refresh, e.g. a client coming back to the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_interval_secs: u64,
    pub maintenance_interval_secs: u64,
    pub maintenance: MaintenanceConfig,
}

/// Drive refresh cycles on a fixed period and on request, plus periodic
/// maintenance. Both tickers fire once immediately.
///
/// Returns when the store becomes unavailable; that condition is fatal for
/// the data layer.
pub async fn run_scheduler<P, S, C>(
    orchestrator: Arc<Orchestrator<P, S, C>>,
    config: SchedulerConfig,
    mut requests: mpsc::Receiver<RefreshRequest>,
) where
    P: PositionSource,
    S: WalletStore,
    C: Clock,
{
    let mut refresh_ticker = interval(Duration::from_secs(config.refresh_interval_secs.max(1)));
    refresh_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut maintenance_ticker =
        interval(Duration::from_secs(config.maintenance_interval_secs.max(1)));
    maintenance_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        refresh_interval_secs = config.refresh_interval_secs,
        maintenance_interval_secs = config.maintenance_interval_secs,
        "Scheduler started"
    );

    loop {
        tokio::select! {
            _ = refresh_ticker.tick() => {
                tracing::debug!("Scheduled refresh cycle");
                if let Err(e) = orchestrator.run_refresh_cycle().await {
                    tracing::error!(error = %e, "Refresh cycle aborted: store unavailable, stopping scheduler");
                    return;
                }
            }
            Some(request) = requests.recv() => {
                tracing::info!(source = %request.source, "Refresh requested");
                if let Err(e) = orchestrator.run_refresh_cycle().await {
                    tracing::error!(error = %e, "Refresh cycle aborted: store unavailable, stopping scheduler");
                    return;
                }
            }
            _ = maintenance_ticker.tick() => {
                if let Err(e) = orchestrator.run_maintenance(&config.maintenance).await {
                    tracing::error!(error = %e, "Maintenance aborted: store unavailable, stopping scheduler");
                    return;
                }
            }
        }
    }
}
