use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;

use super::types::{GraphQlResponse, PositionsData};
use super::{PositionSource, RateLimiter, SourceError};
use crate::clock::Clock;
use crate::models::Position;

/// Result cap the indexer is queried with by default.
pub const DEFAULT_RESULT_LIMIT: u32 = 1_000;

/// Client for the perpetuals indexer's GraphQL `positions` query.
/// Every request passes through the shared [`RateLimiter`].
pub struct GraphQlPositionClient<C: Clock> {
    http: Client,
    endpoint: String,
    result_limit: u32,
    size_decimals: u32,
    limiter: Arc<RateLimiter<C>>,
}

impl<C: Clock> GraphQlPositionClient<C> {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        limiter: Arc<RateLimiter<C>>,
    ) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            result_limit: DEFAULT_RESULT_LIMIT,
            size_decimals: 0,
            limiter,
        })
    }

    pub fn with_result_limit(mut self, result_limit: u32) -> Self {
        self.result_limit = result_limit;
        self
    }

    /// Number of implied decimals in `sizeInUsd` (0 for plain USD values).
    pub fn with_size_decimals(mut self, size_decimals: u32) -> Self {
        self.size_decimals = size_decimals;
        self
    }

    async fn post_query(&self, query: String) -> Result<Vec<Position>, SourceError> {
        self.limiter.throttle().await;
        metrics::counter!("feed_requests_total").increment(1);

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Network(format!("HTTP {status}")));
        }

        let body = resp.bytes().await?;
        parse_positions_response(&body, self.size_decimals)
    }
}

impl<C: Clock> PositionSource for GraphQlPositionClient<C> {
    async fn fetch_positions(
        &self,
        min_size_usd: Option<Decimal>,
    ) -> Result<Vec<Position>, SourceError> {
        let query = build_positions_query(min_size_usd, self.result_limit);

        match self.post_query(query).await {
            Ok(positions) => {
                tracing::debug!(count = positions.len(), "Fetched open positions from feed");
                Ok(positions)
            }
            Err(e) => {
                metrics::counter!("feed_errors_total").increment(1);
                Err(e)
            }
        }
    }
}

/// Build the `positions` query. The `where` clause is only present when a
/// minimum size is requested.
pub fn build_positions_query(min_size_usd: Option<Decimal>, limit: u32) -> String {
    let filter = match min_size_usd {
        Some(min) => format!(r#", where: {{ sizeInUsd_gt: "{}" }}"#, min.normalize()),
        None => String::new(),
    };

    format!(
        "query {{ positions(limit: {limit}{filter}) {{ account isLong sizeInUsd market }} }}"
    )
}

/// Decode a GraphQL response body. A non-empty `errors` list or missing
/// `data` is a rejection, never a partial success.
pub fn parse_positions_response(
    body: &[u8],
    size_decimals: u32,
) -> Result<Vec<Position>, SourceError> {
    let envelope: GraphQlResponse<PositionsData> = serde_json::from_slice(body)
        .map_err(|e| SourceError::Malformed(e.to_string()))?;

    if let Some(errors) = envelope.errors.filter(|errs| !errs.is_empty()) {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        return Err(SourceError::UpstreamRejected(messages.join("; ")));
    }

    let Some(data) = envelope.data else {
        return Err(SourceError::UpstreamRejected("response carried no data".into()));
    };

    data.positions
        .into_iter()
        .map(|p| p.into_position(size_decimals).map_err(SourceError::Malformed))
        .collect()
}
