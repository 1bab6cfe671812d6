use std::collections::BTreeSet;
use std::sync::Arc;

use crate::clock::Clock;
use crate::db::{StoreError, WalletStore};
use crate::feed::PositionSource;
use crate::models::{canonical_address, Position};
use crate::services::seed_list::SeedList;

/// Addresses checked and created per store round-trip.
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryResult {
    /// Unique canonical addresses seen across the feed and the seed list.
    pub addresses_discovered: usize,
    pub wallets_created: usize,
    pub created_addresses: Vec<String>,
    /// Feed snapshot used for this run; `None` if the fetch failed.
    pub positions: Option<Vec<Position>>,
}

/// Merges feed and seed addresses and creates the unknown ones in batches.
pub struct DiscoveryEngine<P, S, C> {
    source: Arc<P>,
    store: Arc<S>,
    clock: Arc<C>,
    seeds: SeedList,
    batch_size: usize,
}

impl<P, S, C> DiscoveryEngine<P, S, C>
where
    P: PositionSource,
    S: WalletStore,
    C: Clock,
{
    pub fn new(source: Arc<P>, store: Arc<S>, clock: Arc<C>, seeds: SeedList) -> Self {
        Self {
            source,
            store,
            clock,
            seeds,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run one discovery pass.
    ///
    /// Feed and seed-list failures degrade to empty inputs. A failing batch is
    /// logged and skipped; only [`StoreError::Unavailable`] is returned.
    pub async fn discover(&self) -> Result<DiscoveryResult, StoreError> {
        let positions = match self.source.fetch_positions(None).await {
            Ok(positions) => Some(positions),
            Err(e) => {
                tracing::warn!(error = %e, "Discovery: position feed unavailable, continuing with seed list");
                None
            }
        };

        let seeds = match self.seeds.load().await {
            Ok(seeds) => seeds,
            Err(e) => {
                tracing::warn!(error = %e, "Discovery: seed list unusable, ignoring it");
                Vec::new()
            }
        };

        let addresses: BTreeSet<String> = positions
            .iter()
            .flatten()
            .map(|p| canonical_address(&p.account))
            .chain(seeds.iter().map(|s| canonical_address(s)))
            .filter(|a| !a.is_empty())
            .collect();

        let mut result = DiscoveryResult {
            addresses_discovered: addresses.len(),
            ..Default::default()
        };

        if addresses.is_empty() {
            tracing::info!("Discovery: no candidate addresses");
            result.positions = positions;
            return Ok(result);
        }

        let addresses: Vec<String> = addresses.into_iter().collect();
        let batch_count = addresses.len().div_ceil(self.batch_size);

        for (index, batch) in addresses.chunks(self.batch_size).enumerate() {
            match self.process_batch(batch).await {
                Ok((created, inserted)) => {
                    result.wallets_created += inserted;
                    result.created_addresses.extend(created);
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        batch = index + 1,
                        batches = batch_count,
                        size = batch.len(),
                        "Discovery: batch failed, continuing with next batch"
                    );
                }
            }
        }

        metrics::counter!("wallets_created_total").increment(result.wallets_created as u64);

        tracing::info!(
            discovered = result.addresses_discovered,
            created = result.wallets_created,
            batches = batch_count,
            "Discovery complete: {} addresses, {} new wallets",
            result.addresses_discovered,
            result.wallets_created,
        );

        result.positions = positions;
        Ok(result)
    }

    /// Check, create and touch one batch. Returns the new addresses and the
    /// number of rows the store actually inserted.
    async fn process_batch(&self, batch: &[String]) -> Result<(Vec<String>, usize), StoreError> {
        let mut known = Vec::new();
        let mut unknown = Vec::new();

        for address in batch {
            if self.store.exists(address).await? {
                known.push(address.clone());
            } else {
                unknown.push(address.clone());
            }
        }

        let now = self.clock.now();

        let inserted = if unknown.is_empty() {
            0
        } else {
            self.store.create_batch(&unknown, now).await?
        };

        if !known.is_empty() {
            match self.store.refresh_last_seen(&known, now).await {
                Ok(_) => {}
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, count = known.len(), "Discovery: failed to refresh last_seen");
                }
            }
        }

        Ok((unknown, inserted))
    }
}
