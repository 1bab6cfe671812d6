pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod services;

use tokio::sync::{broadcast, mpsc};

use crate::clock::SystemClock;
use crate::db::SqliteWalletStore;
use crate::feed::GraphQlPositionClient;
use crate::services::{Orchestrator, RefreshEvent, RefreshRequest};

/// The production pipeline: live feed, SQLite store, wall clock.
pub type LiveOrchestrator =
    Orchestrator<GraphQlPositionClient<SystemClock>, SqliteWalletStore, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteWalletStore,
    pub events: broadcast::Sender<RefreshEvent>,
    pub refresh_tx: mpsc::Sender<RefreshRequest>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Bearer token for `/api` and `/ws`; `None` disables auth.
    pub api_token: Option<String>,
}
