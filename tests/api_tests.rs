mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;

use whalewatch::api::router::create_router;
use whalewatch::db::{SqliteWalletStore, WalletStore};
use whalewatch::models::{PositionSnapshot, SizeCategory};
use whalewatch::services::{RefreshEvent, RefreshRequest};
use whalewatch::AppState;

struct TestApp {
    router: axum::Router,
    store: SqliteWalletStore,
    refresh_rx: mpsc::Receiver<RefreshRequest>,
}

async fn build_test_app(api_token: Option<&str>) -> TestApp {
    let store = common::setup_test_store().await;
    let (events, _) = broadcast::channel::<RefreshEvent>(16);
    let (refresh_tx, refresh_rx) = mpsc::channel::<RefreshRequest>(1);

    let state = AppState {
        store: store.clone(),
        events,
        refresh_tx,
        metrics_handle: whalewatch::metrics::detached_handle(),
        api_token: api_token.map(str::to_string),
    };

    TestApp {
        router: create_router(state),
        store,
        refresh_rx,
    }
}

async fn seed_classified(store: &SqliteWalletStore) {
    let t0 = common::start_time();
    for (address, category, coin, is_long, size) in [
        ("0xaa", SizeCategory::Small, "ETH", true, 5_000),
        ("0xbb", SizeCategory::Whale, "BTC", false, 2_000_000),
    ] {
        store.create(address, t0).await.unwrap();
        store.update_category(address, category, t0).await.unwrap();
        let p = common::position(address, is_long, size, coin);
        store
            .replace_positions(address, &[PositionSnapshot::from_position(address, &p, t0)])
            .await
            .unwrap();
    }
}

async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let app = build_test_app(None).await;

    let (status, json) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_list_wallets_with_filters() {
    let app = build_test_app(None).await;
    seed_classified(&app.store).await;

    let (status, json) = get_json(&app.router, "/api/wallets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, json) = get_json(&app.router, "/api/wallets?category=whale").await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["address"], "0xbb");
    assert_eq!(data[0]["category"], "whale");

    let (_, json) = get_json(&app.router, "/api/wallets?side=long").await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["address"], "0xaa");

    let (_, json) = get_json(&app.router, "/api/wallets?coin=btc&category=small").await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_wallets_rejects_unknown_category() {
    let app = build_test_app(None).await;

    let (status, json) = get_json(&app.router, "/api/wallets?category=krill").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_wallet_detail_and_positions() {
    let app = build_test_app(None).await;
    seed_classified(&app.store).await;

    let (status, json) = get_json(&app.router, "/api/wallets/0xBB").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["address"], "0xbb");
    assert_eq!(json["data"]["positions"][0]["coin"], "BTC");
    assert_eq!(json["data"]["positions"][0]["side"], "short");

    let (status, json) = get_json(&app.router, "/api/wallets/0xaa/positions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, _) = get_json(&app.router, "/api/wallets/0xnobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&app.router, "/api/wallets/0xnobody/positions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_wallet() {
    let app = build_test_app(None).await;
    seed_classified(&app.store).await;

    let delete = |uri: &'static str| {
        app.router.clone().oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
    };

    let resp = delete("/api/wallets/0xaa").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!app.store.exists("0xaa").await.unwrap());

    let resp = delete("/api/wallets/0xaa").await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_statistics_lists_every_category() {
    let app = build_test_app(None).await;
    seed_classified(&app.store).await;

    let (status, json) = get_json(&app.router, "/api/statistics").await;
    assert_eq!(status, StatusCode::OK);

    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    let whale = rows.iter().find(|r| r["category"] == "whale").unwrap();
    assert_eq!(whale["short"], 1);
    assert_eq!(whale["total"], 1);
    assert_eq!(whale["display_name"], SizeCategory::Whale.display_name());
    let micro = rows.iter().find(|r| r["category"] == "micro").unwrap();
    assert_eq!(micro["total"], 0);

    let (_, json) = get_json(&app.router, "/api/statistics?coin=eth").await;
    let rows = json["data"].as_array().unwrap();
    let small = rows.iter().find(|r| r["category"] == "small").unwrap();
    assert_eq!(small["long"], 1);
    let whale = rows.iter().find(|r| r["category"] == "whale").unwrap();
    assert_eq!(whale["total"], 0);
}

#[tokio::test]
async fn test_refresh_request_is_queued_once() {
    let mut app = build_test_app(None).await;

    let post = || {
        app.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
    };

    let resp = post().await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let resp = post().await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["status"], "already_queued");

    let request = app.refresh_rx.try_recv().unwrap();
    assert_eq!(request.source, "api");
    assert!(app.refresh_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_refresh_without_scheduler_is_unavailable() {
    let app = build_test_app(None).await;
    drop(app.refresh_rx);

    let resp = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_api_token_required_when_configured() {
    let app = build_test_app(Some("s3cret")).await;

    let (status, _) = get_json(&app.router, "/api/wallets").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/wallets")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Health stays public
    let (status, _) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = build_test_app(None).await;

    let resp = app
        .router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}
