use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use whalewatch::api::router::create_router;
use whalewatch::clock::SystemClock;
use whalewatch::config::AppConfig;
use whalewatch::db::{self, SqliteWalletStore};
use whalewatch::feed::{GraphQlPositionClient, RateLimiter};
use whalewatch::services::{run_scheduler, Orchestrator, RefreshEvent, RefreshRequest};
use whalewatch::{AppState, LiveOrchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Opening wallet store...");
    let pool = db::init_pool(&config.database_url, config.database_max_connections).await?;
    let store = Arc::new(SqliteWalletStore::new(pool));
    tracing::info!(url = %config.database_url, "Wallet store ready");

    let metrics_handle = whalewatch::metrics::init_metrics()?;

    // --- Position feed ---
    let clock = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(
        clock.clone(),
        Duration::from_millis(config.feed_min_interval_ms),
    ));
    let source = GraphQlPositionClient::new(
        config.feed_graphql_url.clone(),
        Duration::from_secs(config.feed_timeout_secs),
        limiter,
    )?
    .with_result_limit(config.feed_result_limit)
    .with_size_decimals(config.feed_size_decimals);

    // --- Pipeline: discovery → classification, scheduled + on demand ---
    let (events_tx, _) = broadcast::channel::<RefreshEvent>(64);
    let (refresh_tx, refresh_rx) = mpsc::channel::<RefreshRequest>(1);

    let orchestrator: Arc<LiveOrchestrator> = Arc::new(
        Orchestrator::new(
            Arc::new(source),
            store.clone(),
            clock,
            config.seed_list(),
            events_tx.clone(),
        )
        .with_batch_size(config.discovery_batch_size),
    );

    let scheduler_config = config.scheduler_config();
    tokio::spawn(async move {
        run_scheduler(orchestrator, scheduler_config, refresh_rx).await;
        tracing::error!("Scheduler stopped; wallet data will no longer refresh");
    });

    let state = AppState {
        store: store.as_ref().clone(),
        events: events_tx,
        refresh_tx,
        metrics_handle,
        api_token: config.api_token.clone(),
    };
    if state.api_token.is_none() {
        tracing::warn!("API_TOKEN not set; /api and /ws are unauthenticated");
    }
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
