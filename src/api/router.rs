use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Bearer token required when API_TOKEN is set
    let protected = Router::new()
        .route("/api/wallets", get(handlers::wallets::list))
        .route(
            "/api/wallets/:address",
            get(handlers::wallets::detail).delete(handlers::wallets::delete),
        )
        .route("/api/wallets/:address/positions", get(handlers::wallets::positions))
        .route("/api/statistics", get(handlers::statistics::get_statistics))
        .route("/api/refresh", post(handlers::refresh::trigger))
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
