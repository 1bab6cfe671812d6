use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::db::{StoreError, WalletStore};
use crate::feed::PositionSource;
use crate::intelligence::classifier::{positions_for, profile_wallet};
use crate::models::{canonical_address, Position, PositionSnapshot, Wallet};

/// Assigns size tiers to wallets from their open positions.
pub struct ClassificationEngine<P, S, C> {
    source: Arc<P>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<P, S, C> ClassificationEngine<P, S, C>
where
    P: PositionSource,
    S: WalletStore,
    C: Clock,
{
    pub fn new(source: Arc<P>, store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    /// Classify one wallet against a fresh feed snapshot.
    ///
    /// `None` when the wallet has no open positions or anything failed;
    /// failures are logged.
    pub async fn classify(&self, address: &str) -> Option<Wallet> {
        let positions = match self.source.fetch_positions(None).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, address = %address, "Classification: feed unavailable");
                return None;
            }
        };

        match self.classify_with(address, &positions).await {
            Ok(wallet) => wallet,
            Err(e) => {
                tracing::warn!(error = %e, address = %address, "Classification failed");
                None
            }
        }
    }

    /// Classify one wallet against an existing feed snapshot.
    ///
    /// Without matching positions the wallet is left untouched. Otherwise the
    /// category, check time and last-seen go out in one write, followed by a
    /// refresh of its position snapshots.
    pub async fn classify_with(
        &self,
        address: &str,
        positions: &[Position],
    ) -> Result<Option<Wallet>, StoreError> {
        let address = canonical_address(address);

        let Some(profile) = profile_wallet(&address, positions) else {
            tracing::debug!(address = %address, "No open positions, skipping classification");
            return Ok(None);
        };

        let now = self.clock.now();
        let wallet = self
            .store
            .update_category(&address, profile.category, now)
            .await?;

        let snapshots: Vec<PositionSnapshot> = positions_for(&address, positions)
            .into_iter()
            .map(|p| PositionSnapshot::from_position(&address, p, now))
            .collect();

        match self.store.replace_positions(&address, &snapshots).await {
            Ok(()) => {}
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, address = %address, "Failed to store position snapshots");
            }
        }

        metrics::counter!("wallets_classified_total", "category" => profile.category.as_str())
            .increment(1);

        tracing::info!(
            address = %address,
            category = %profile.category,
            side = %profile.side,
            exposure_usd = %profile.exposure_usd,
            positions = profile.position_count,
            "Wallet classified"
        );

        Ok(Some(wallet))
    }

    /// Classify many wallets with a single feed fetch. Returns how many were
    /// classified; a feed failure classifies none.
    pub async fn classify_batch(&self, addresses: &[String]) -> Result<usize, StoreError> {
        if addresses.is_empty() {
            return Ok(0);
        }

        let positions = match self.source.fetch_positions(None).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    wallets = addresses.len(),
                    "Classification: feed unavailable, batch skipped"
                );
                return Ok(0);
            }
        };

        self.classify_batch_with(addresses, &positions).await
    }

    /// Classify many wallets against one feed snapshot. Per-wallet failures
    /// are logged and skipped; only [`StoreError::Unavailable`] aborts.
    pub async fn classify_batch_with(
        &self,
        addresses: &[String],
        positions: &[Position],
    ) -> Result<usize, StoreError> {
        let mut classified = 0usize;

        for address in addresses {
            match self.classify_with(address, positions).await {
                Ok(Some(_)) => classified += 1,
                Ok(None) => {}
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, address = %address, "Classification failed, continuing");
                }
            }
        }

        tracing::info!(
            requested = addresses.len(),
            classified,
            "Classification batch complete"
        );

        Ok(classified)
    }

    /// Re-classify up to `limit` wallets not attempted within `max_age`.
    ///
    /// Every selected wallet gets its attempt stamped once the feed has been
    /// fetched, so wallets without positions move to the back of the queue.
    pub async fn classify_stale(
        &self,
        max_age: chrono::Duration,
        limit: i64,
    ) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stale = self.store.fetch_stale(cutoff, limit).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let addresses: Vec<String> = stale.into_iter().map(|w| w.address).collect();

        let positions = match self.source.fetch_positions(None).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    wallets = addresses.len(),
                    "Stale re-classification: feed unavailable, retrying next pass"
                );
                return Ok(0);
            }
        };

        match self.store.mark_check_attempted(&addresses, now).await {
            Ok(_) => {}
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, count = addresses.len(), "Failed to stamp classification attempts");
            }
        }

        tracing::info!(count = addresses.len(), "Re-classifying stale wallets");

        self.classify_batch_with(&addresses, &positions).await
    }
}
