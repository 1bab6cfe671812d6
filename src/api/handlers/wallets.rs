use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::db::WalletStore;
use crate::errors::AppError;
use crate::models::{canonical_address, PositionSnapshot, Side, SizeCategory, Wallet};
use crate::AppState;

/// Optional filters for `GET /api/wallets`. All given filters must match.
#[derive(Debug, Default, Deserialize)]
pub struct WalletFilter {
    pub category: Option<String>,
    pub side: Option<String>,
    pub coin: Option<String>,
}

#[derive(Serialize)]
pub struct WalletDetail {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub positions: Vec<PositionSnapshot>,
}

#[derive(Serialize)]
pub struct DeleteResult {
    pub address: String,
    pub deleted: bool,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<WalletFilter>,
) -> Result<Json<ApiResponse<Vec<Wallet>>>, AppError> {
    let category = non_blank(&filter.category)
        .map(|raw| raw.parse::<SizeCategory>())
        .transpose()
        .map_err(AppError::BadRequest)?;
    let side = non_blank(&filter.side)
        .map(|raw| raw.parse::<Side>())
        .transpose()
        .map_err(AppError::BadRequest)?;
    let coin = non_blank(&filter.coin);

    let mut wallets = match category {
        Some(category) => state.store.fetch_by_category(category).await?,
        None => state.store.fetch_all().await?,
    };

    if let Some(side) = side {
        let matching: BTreeSet<String> = state
            .store
            .fetch_by_side(side)
            .await?
            .into_iter()
            .map(|w| w.address)
            .collect();
        wallets.retain(|w| matching.contains(&w.address));
    }

    if let Some(coin) = coin {
        let matching: BTreeSet<String> = state
            .store
            .fetch_by_coin(coin)
            .await?
            .into_iter()
            .map(|w| w.address)
            .collect();
        wallets.retain(|w| matching.contains(&w.address));
    }

    Ok(ApiResponse::ok(wallets))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<WalletDetail>>, AppError> {
    let address = canonical_address(&address);
    let wallet = state
        .store
        .fetch_by_address(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("wallet {address}")))?;
    let positions = state.store.positions_for(&address).await?;

    Ok(ApiResponse::ok(WalletDetail { wallet, positions }))
}

pub async fn positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<Vec<PositionSnapshot>>>, AppError> {
    let address = canonical_address(&address);
    if !state.store.exists(&address).await? {
        return Err(AppError::NotFound(format!("wallet {address}")));
    }
    let positions = state.store.positions_for(&address).await?;
    Ok(ApiResponse::ok(positions))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<DeleteResult>>, AppError> {
    let address = canonical_address(&address);
    if !state.store.delete(&address).await? {
        return Err(AppError::NotFound(format!("wallet {address}")));
    }
    tracing::info!(wallet = %address, "Wallet deleted via API");
    Ok(ApiResponse::ok(DeleteResult {
        address,
        deleted: true,
    }))
}
