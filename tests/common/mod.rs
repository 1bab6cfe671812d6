use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use whalewatch::clock::ManualClock;
use whalewatch::db::{init_pool, SqliteWalletStore, StoreError, WalletStatistics, WalletStore};
use whalewatch::feed::{PositionSource, SourceError};
use whalewatch::models::{Position, PositionSnapshot, Side, SizeCategory, Wallet};

/// Fresh in-memory store with migrations applied.
#[allow(dead_code)]
pub async fn setup_test_store() -> SqliteWalletStore {
    let pool = init_pool("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory store");
    SqliteWalletStore::new(pool)
}

#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

#[allow(dead_code)]
pub fn position(account: &str, is_long: bool, size_usd: i64, market: &str) -> Position {
    Position {
        account: account.to_string(),
        is_long,
        size_usd: Decimal::from(size_usd),
        market: market.to_string(),
    }
}

/// Position source that replays scripted responses, then repeats the last
/// one. Counts every fetch.
#[allow(dead_code)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Position>, String>>>,
    last: Mutex<Result<Vec<Position>, String>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn returning(positions: Vec<Position>) -> Self {
        Self::scripted(vec![Ok(positions)])
    }

    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![Err(message.to_string())])
    }

    pub fn scripted(responses: Vec<Result<Vec<Position>, String>>) -> Self {
        let last = responses.last().cloned().unwrap_or_else(|| Ok(Vec::new()));
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PositionSource for ScriptedSource {
    async fn fetch_positions(
        &self,
        _min_size_usd: Option<Decimal>,
    ) -> Result<Vec<Position>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());
        next.map_err(SourceError::Network)
    }
}

/// How [`RecordingStore`] sabotages `create_batch`.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum BatchFault {
    None,
    /// Fail the n-th call (1-based) with `WriteFailed`.
    WriteFailedOn(usize),
    /// Fail the n-th call (1-based) with `Unavailable`.
    UnavailableOn(usize),
}

/// SQLite store wrapper recording `create_batch` sizes and injecting faults.
#[allow(dead_code)]
pub struct RecordingStore {
    pub inner: SqliteWalletStore,
    fault: BatchFault,
    batches: Mutex<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new(inner: SqliteWalletStore, fault: BatchFault) -> Self {
        Self {
            inner,
            fault,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Every address passed to `create_batch`, in call order.
    pub fn batched_addresses(&self) -> Vec<String> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

impl WalletStore for RecordingStore {
    async fn fetch_all(&self) -> Result<Vec<Wallet>, StoreError> {
        self.inner.fetch_all().await
    }

    async fn fetch_by_address(&self, address: &str) -> Result<Option<Wallet>, StoreError> {
        self.inner.fetch_by_address(address).await
    }

    async fn exists(&self, address: &str) -> Result<bool, StoreError> {
        self.inner.exists(address).await
    }

    async fn create(&self, address: &str, seen_at: DateTime<Utc>) -> Result<Wallet, StoreError> {
        self.inner.create(address, seen_at).await
    }

    async fn create_batch(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(addresses.to_vec());
            batches.len()
        };
        match self.fault {
            BatchFault::WriteFailedOn(n) if n == call => {
                Err(StoreError::WriteFailed("injected batch failure".into()))
            }
            BatchFault::UnavailableOn(n) if n == call => {
                Err(StoreError::Unavailable("injected outage".into()))
            }
            _ => self.inner.create_batch(addresses, seen_at).await,
        }
    }

    async fn update_category(
        &self,
        address: &str,
        category: SizeCategory,
        checked_at: DateTime<Utc>,
    ) -> Result<Wallet, StoreError> {
        self.inner.update_category(address, category, checked_at).await
    }

    async fn update_last_seen(&self, address: &str, seen_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.update_last_seen(address, seen_at).await
    }

    async fn refresh_last_seen(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.inner.refresh_last_seen(addresses, seen_at).await
    }

    async fn delete(&self, address: &str) -> Result<bool, StoreError> {
        self.inner.delete(address).await
    }

    async fn delete_inactive(
        &self,
        older_than_days: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.inner.delete_inactive(older_than_days, now).await
    }

    async fn count(&self) -> Result<i64, StoreError> {
        self.inner.count().await
    }

    async fn fetch_by_category(&self, category: SizeCategory) -> Result<Vec<Wallet>, StoreError> {
        self.inner.fetch_by_category(category).await
    }

    async fn fetch_by_side(&self, side: Side) -> Result<Vec<Wallet>, StoreError> {
        self.inner.fetch_by_side(side).await
    }

    async fn fetch_by_coin(&self, coin: &str) -> Result<Vec<Wallet>, StoreError> {
        self.inner.fetch_by_coin(coin).await
    }

    async fn fetch_stale(
        &self,
        checked_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Wallet>, StoreError> {
        self.inner.fetch_stale(checked_before, limit).await
    }

    async fn mark_check_attempted(
        &self,
        addresses: &[String],
        attempted_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.inner.mark_check_attempted(addresses, attempted_at).await
    }

    async fn replace_positions(
        &self,
        address: &str,
        snapshots: &[PositionSnapshot],
    ) -> Result<(), StoreError> {
        self.inner.replace_positions(address, snapshots).await
    }

    async fn positions_for(&self, address: &str) -> Result<Vec<PositionSnapshot>, StoreError> {
        self.inner.positions_for(address).await
    }

    async fn statistics(&self, coin: Option<&str>) -> Result<WalletStatistics, StoreError> {
        self.inner.statistics(coin).await
    }
}
