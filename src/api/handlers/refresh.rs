use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

use super::ApiResponse;
use crate::errors::AppError;
use crate::services::RefreshRequest;
use crate::AppState;

#[derive(Serialize)]
pub struct RefreshAccepted {
    pub status: &'static str,
}

/// Queue an on-demand refresh cycle. Requests that arrive while one is
/// already queued are coalesced into it.
pub async fn trigger(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<RefreshAccepted>>), AppError> {
    let request = RefreshRequest {
        source: "api".into(),
    };

    let status = match state.refresh_tx.try_send(request) {
        Ok(()) => "queued",
        Err(TrySendError::Full(_)) => "already_queued",
        Err(TrySendError::Closed(_)) => {
            return Err(AppError::Unavailable("refresh scheduler is not running".into()));
        }
    };

    tracing::info!(status, "Refresh requested via API");
    Ok((StatusCode::ACCEPTED, ApiResponse::ok(RefreshAccepted { status })))
}
