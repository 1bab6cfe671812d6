use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::db::WalletStore;
use crate::errors::AppError;
use crate::models::{Side, SizeCategory};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub coin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryStatistics {
    pub category: SizeCategory,
    pub display_name: &'static str,
    pub long: i64,
    pub short: i64,
    pub neutral: i64,
    pub total: i64,
}

/// Per-category wallet counts split by dominant side, every category listed.
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryStatistics>>>, AppError> {
    let coin = query
        .coin
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let stats = state.store.statistics(coin).await?;

    let rows = SizeCategory::ALL
        .iter()
        .map(|category| {
            let sides = stats.get(category);
            let count = |side: Side| sides.and_then(|s| s.get(&side)).copied().unwrap_or(0);
            let (long, short, neutral) = (count(Side::Long), count(Side::Short), count(Side::Neutral));
            CategoryStatistics {
                category: *category,
                display_name: category.display_name(),
                long,
                short,
                neutral,
                total: long + short + neutral,
            }
        })
        .collect();

    Ok(ApiResponse::ok(rows))
}
