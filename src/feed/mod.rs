pub mod graphql_client;
pub mod rate_limiter;
pub mod types;

pub use graphql_client::GraphQlPositionClient;
pub use rate_limiter::RateLimiter;

use std::future::Future;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Position;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("position feed request failed: {0}")]
    Network(String),

    #[error("malformed position feed payload: {0}")]
    Malformed(String),

    #[error("position feed rejected the query: {0}")]
    UpstreamRejected(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// Source of currently open positions.
pub trait PositionSource: Send + Sync {
    /// Fetch open positions, optionally only those larger than
    /// `min_size_usd`.
    fn fetch_positions(
        &self,
        min_size_usd: Option<Decimal>,
    ) -> impl Future<Output = Result<Vec<Position>, SourceError>> + Send;
}
