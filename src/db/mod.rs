pub mod position_repo;
pub mod wallet_repo;

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{PositionSnapshot, Side, SizeCategory, Wallet};

/// Category → side → wallet count.
pub type WalletStatistics = BTreeMap<SizeCategory, BTreeMap<Side, i64>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wallet not found: {0}")]
    NotFound(String),

    #[error("store write failed: {0}")]
    WriteFailed(String),

    #[error("stored row could not be decoded: {0}")]
    Corrupt(String),

    /// The persistence layer itself is gone. The only store error that is
    /// allowed to abort a refresh cycle.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Migrate(_) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::WriteFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Persistence seam for wallet records and their position snapshots.
///
/// Addresses passed in are expected in canonical form
/// (see [`crate::models::canonical_address`]).
pub trait WalletStore: Send + Sync {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Wallet>, StoreError>> + Send;

    fn fetch_by_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Wallet>, StoreError>> + Send;

    fn exists(&self, address: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn create(
        &self,
        address: &str,
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    /// Create every address that does not exist yet in one transaction.
    /// Returns the number of rows actually inserted.
    fn create_batch(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Set category, `last_position_check`, `last_check_attempt` and
    /// `last_seen` in a single write.
    fn update_category(
        &self,
        address: &str,
        category: SizeCategory,
        checked_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    fn update_last_seen(
        &self,
        address: &str,
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Bump `last_seen` for every existing address in the slice.
    fn refresh_last_seen(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn delete(&self, address: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Remove wallets whose `last_seen` is older than `older_than_days`
    /// before `now`.
    fn delete_inactive(
        &self,
        older_than_days: u32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn count(&self) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn fetch_by_category(
        &self,
        category: SizeCategory,
    ) -> impl Future<Output = Result<Vec<Wallet>, StoreError>> + Send;

    fn fetch_by_side(
        &self,
        side: Side,
    ) -> impl Future<Output = Result<Vec<Wallet>, StoreError>> + Send;

    fn fetch_by_coin(
        &self,
        coin: &str,
    ) -> impl Future<Output = Result<Vec<Wallet>, StoreError>> + Send;

    /// Wallets never attempted or last attempted before `checked_before`,
    /// oldest attempt first.
    fn fetch_stale(
        &self,
        checked_before: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Wallet>, StoreError>> + Send;

    /// Record a classification attempt, successful or not.
    fn mark_check_attempted(
        &self,
        addresses: &[String],
        attempted_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn replace_positions(
        &self,
        address: &str,
        snapshots: &[PositionSnapshot],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn positions_for(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Vec<PositionSnapshot>, StoreError>> + Send;

    fn statistics(
        &self,
        coin: Option<&str>,
    ) -> impl Future<Output = Result<WalletStatistics, StoreError>> + Send;
}

/// SQLite-backed [`WalletStore`].
#[derive(Debug, Clone)]
pub struct SqliteWalletStore {
    pool: SqlitePool,
}

impl SqliteWalletStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl WalletStore for SqliteWalletStore {
    async fn fetch_all(&self) -> Result<Vec<Wallet>, StoreError> {
        wallet_repo::get_all_wallets(&self.pool).await
    }

    async fn fetch_by_address(&self, address: &str) -> Result<Option<Wallet>, StoreError> {
        wallet_repo::get_wallet_by_address(&self.pool, address).await
    }

    async fn exists(&self, address: &str) -> Result<bool, StoreError> {
        wallet_repo::wallet_exists(&self.pool, address).await
    }

    async fn create(&self, address: &str, seen_at: DateTime<Utc>) -> Result<Wallet, StoreError> {
        wallet_repo::insert_wallet(&self.pool, address, seen_at).await
    }

    async fn create_batch(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        wallet_repo::insert_wallets(&self.pool, addresses, seen_at).await
    }

    async fn update_category(
        &self,
        address: &str,
        category: SizeCategory,
        checked_at: DateTime<Utc>,
    ) -> Result<Wallet, StoreError> {
        wallet_repo::update_wallet_category(&self.pool, address, category, checked_at).await
    }

    async fn update_last_seen(
        &self,
        address: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        wallet_repo::touch_wallet_last_seen(&self.pool, address, seen_at).await
    }

    async fn refresh_last_seen(
        &self,
        addresses: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        wallet_repo::touch_wallets_last_seen(&self.pool, addresses, seen_at).await
    }

    async fn delete(&self, address: &str) -> Result<bool, StoreError> {
        wallet_repo::delete_wallet(&self.pool, address).await
    }

    async fn delete_inactive(
        &self,
        older_than_days: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let cutoff = now
            .checked_sub_signed(chrono::Duration::days(i64::from(older_than_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        wallet_repo::delete_wallets_not_seen_since(&self.pool, cutoff).await
    }

    async fn count(&self) -> Result<i64, StoreError> {
        wallet_repo::count_wallets(&self.pool).await
    }

    async fn fetch_by_category(&self, category: SizeCategory) -> Result<Vec<Wallet>, StoreError> {
        wallet_repo::get_wallets_by_category(&self.pool, category).await
    }

    async fn fetch_by_side(&self, side: Side) -> Result<Vec<Wallet>, StoreError> {
        wallet_repo::get_wallets_by_side(&self.pool, side).await
    }

    async fn fetch_by_coin(&self, coin: &str) -> Result<Vec<Wallet>, StoreError> {
        wallet_repo::get_wallets_by_coin(&self.pool, coin).await
    }

    async fn fetch_stale(
        &self,
        checked_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Wallet>, StoreError> {
        wallet_repo::get_stale_wallets(&self.pool, checked_before, limit).await
    }

    async fn mark_check_attempted(
        &self,
        addresses: &[String],
        attempted_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        wallet_repo::mark_check_attempted(&self.pool, addresses, attempted_at).await
    }

    async fn replace_positions(
        &self,
        address: &str,
        snapshots: &[PositionSnapshot],
    ) -> Result<(), StoreError> {
        position_repo::replace_wallet_positions(&self.pool, address, snapshots).await
    }

    async fn positions_for(&self, address: &str) -> Result<Vec<PositionSnapshot>, StoreError> {
        position_repo::get_positions_by_wallet(&self.pool, address).await
    }

    async fn statistics(&self, coin: Option<&str>) -> Result<WalletStatistics, StoreError> {
        wallet_repo::get_statistics(&self.pool, coin).await
    }
}

/// Open the SQLite pool and apply embedded migrations.
///
/// In-memory databases live and die with their connection, so they get a
/// single connection that is never recycled.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let mut pool_options = SqlitePoolOptions::new();
    if in_memory {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        pool_options = pool_options.max_connections(max_connections);
    }

    let pool = pool_options.connect_with(options).await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
