use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{StoreError, WalletStatistics};
use crate::models::{Side, SizeCategory, Wallet};

/// Per-wallet dominant side derived from snapshot counts. Ties are neutral.
/// `?1` optionally restricts the snapshots to one coin.
const WALLET_SIDES_SQL: &str = r#"
    SELECT wallet_address,
           CASE
               WHEN SUM(CASE WHEN side = 'long' THEN 1 ELSE 0 END)
                  > SUM(CASE WHEN side = 'short' THEN 1 ELSE 0 END) THEN 'long'
               WHEN SUM(CASE WHEN side = 'short' THEN 1 ELSE 0 END)
                  > SUM(CASE WHEN side = 'long' THEN 1 ELSE 0 END) THEN 'short'
               ELSE 'neutral'
           END AS side
    FROM wallet_positions
    WHERE (?1 IS NULL OR coin = ?1 COLLATE NOCASE)
    GROUP BY wallet_address
"#;

/// Fetch every wallet, most recently seen first.
pub async fn get_all_wallets(pool: &SqlitePool) -> Result<Vec<Wallet>, StoreError> {
    let wallets = sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets ORDER BY last_seen DESC, address ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(wallets)
}

/// Fetch a wallet by its canonical address.
pub async fn get_wallet_by_address(
    pool: &SqlitePool,
    address: &str,
) -> Result<Option<Wallet>, StoreError> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE address = ?1")
        .bind(address)
        .fetch_optional(pool)
        .await?;

    Ok(wallet)
}

pub async fn wallet_exists(pool: &SqlitePool, address: &str) -> Result<bool, StoreError> {
    let row: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM wallets WHERE address = ?1)")
        .bind(address)
        .fetch_one(pool)
        .await?;

    Ok(row.0 != 0)
}

/// Insert a wallet first seen at `seen_at`. Returns the existing row if the
/// address is already known; `first_seen` is never rewritten.
pub async fn insert_wallet(
    pool: &SqlitePool,
    address: &str,
    seen_at: DateTime<Utc>,
) -> Result<Wallet, StoreError> {
    sqlx::query(
        r#"
        INSERT INTO wallets (address, first_seen, last_seen)
        VALUES (?1, ?2, ?2)
        ON CONFLICT (address) DO NOTHING
        "#,
    )
    .bind(address)
    .bind(seen_at)
    .execute(pool)
    .await?;

    get_wallet_by_address(pool, address)
        .await?
        .ok_or_else(|| StoreError::WriteFailed(format!("wallet {address} missing after insert")))
}

/// Insert a batch of new wallets inside one transaction. Already-known
/// addresses are ignored. Returns the number of rows inserted.
pub async fn insert_wallets(
    pool: &SqlitePool,
    addresses: &[String],
    seen_at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    if addresses.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for address in addresses {
        let result = sqlx::query(
            r#"
            INSERT INTO wallets (address, first_seen, last_seen)
            VALUES (?1, ?2, ?2)
            ON CONFLICT (address) DO NOTHING
            "#,
        )
        .bind(address)
        .bind(seen_at)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected() as usize;
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Record a classification: category, check time and last-seen in one
/// statement.
pub async fn update_wallet_category(
    pool: &SqlitePool,
    address: &str,
    category: SizeCategory,
    checked_at: DateTime<Utc>,
) -> Result<Wallet, StoreError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        UPDATE wallets
        SET category = ?2,
            last_position_check = ?3,
            last_check_attempt = ?3,
            last_seen = ?3
        WHERE address = ?1
        RETURNING *
        "#,
    )
    .bind(address)
    .bind(category)
    .bind(checked_at)
    .fetch_optional(pool)
    .await?;

    wallet.ok_or_else(|| StoreError::NotFound(address.to_string()))
}

pub async fn touch_wallet_last_seen(
    pool: &SqlitePool,
    address: &str,
    seen_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE wallets SET last_seen = ?2 WHERE address = ?1")
        .bind(address)
        .bind(seen_at)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(address.to_string()));
    }

    Ok(())
}

/// Bump `last_seen` for a batch of addresses. Unknown addresses are skipped.
pub async fn touch_wallets_last_seen(
    pool: &SqlitePool,
    addresses: &[String],
    seen_at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    if addresses.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut touched = 0usize;

    for address in addresses {
        let result = sqlx::query("UPDATE wallets SET last_seen = ?2 WHERE address = ?1")
            .bind(address)
            .bind(seen_at)
            .execute(&mut *tx)
            .await?;
        touched += result.rows_affected() as usize;
    }

    tx.commit().await?;

    Ok(touched)
}

/// Delete a wallet and (via cascade) its position snapshots.
pub async fn delete_wallet(pool: &SqlitePool, address: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM wallets WHERE address = ?1")
        .bind(address)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_wallets_not_seen_since(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let result = sqlx::query("DELETE FROM wallets WHERE last_seen < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

pub async fn count_wallets(pool: &SqlitePool) -> Result<i64, StoreError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallets")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn get_wallets_by_category(
    pool: &SqlitePool,
    category: SizeCategory,
) -> Result<Vec<Wallet>, StoreError> {
    let wallets = sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets WHERE category = ?1 ORDER BY last_seen DESC, address ASC",
    )
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(wallets)
}

/// Classified wallets whose snapshot-derived dominant side equals `side`.
/// A classified wallet without snapshots is neutral, matching
/// [`get_statistics`].
pub async fn get_wallets_by_side(
    pool: &SqlitePool,
    side: Side,
) -> Result<Vec<Wallet>, StoreError> {
    let sql = format!(
        r#"
        SELECT w.*
        FROM wallets w
        LEFT JOIN ({WALLET_SIDES_SQL}) s ON s.wallet_address = w.address
        WHERE w.category IS NOT NULL
          AND COALESCE(s.side, 'neutral') = ?2
        ORDER BY w.last_seen DESC, w.address ASC
        "#
    );

    let wallets = sqlx::query_as::<_, Wallet>(&sql)
        .bind(Option::<&str>::None)
        .bind(side)
        .fetch_all(pool)
        .await?;

    Ok(wallets)
}

/// Wallets holding at least one snapshot in `coin` (case-insensitive).
pub async fn get_wallets_by_coin(pool: &SqlitePool, coin: &str) -> Result<Vec<Wallet>, StoreError> {
    let wallets = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT * FROM wallets
        WHERE address IN (
            SELECT wallet_address FROM wallet_positions WHERE coin = ?1 COLLATE NOCASE
        )
        ORDER BY last_seen DESC, address ASC
        "#,
    )
    .bind(coin)
    .fetch_all(pool)
    .await?;

    Ok(wallets)
}

/// Wallets never attempted first, then the oldest attempts. Attempts that
/// found no positions count, so empty wallets rotate out of the queue.
pub async fn get_stale_wallets(
    pool: &SqlitePool,
    checked_before: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Wallet>, StoreError> {
    let wallets = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT * FROM wallets
        WHERE last_check_attempt IS NULL OR last_check_attempt < ?1
        ORDER BY last_check_attempt IS NOT NULL, last_check_attempt ASC, address ASC
        LIMIT ?2
        "#,
    )
    .bind(checked_before)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(wallets)
}

/// Stamp a classification attempt on every existing address in the slice.
pub async fn mark_check_attempted(
    pool: &SqlitePool,
    addresses: &[String],
    attempted_at: DateTime<Utc>,
) -> Result<usize, StoreError> {
    if addresses.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut marked = 0usize;

    for address in addresses {
        let result = sqlx::query("UPDATE wallets SET last_check_attempt = ?2 WHERE address = ?1")
            .bind(address)
            .bind(attempted_at)
            .execute(&mut *tx)
            .await?;
        marked += result.rows_affected() as usize;
    }

    tx.commit().await?;

    Ok(marked)
}

/// Count classified wallets per category and dominant side.
///
/// With a coin filter, only wallets holding that coin are counted and the side
/// comes from that coin's snapshots alone. Without one, classified wallets
/// lacking snapshots count as neutral.
pub async fn get_statistics(
    pool: &SqlitePool,
    coin: Option<&str>,
) -> Result<WalletStatistics, StoreError> {
    let sql = format!(
        r#"
        SELECT w.category AS category,
               COALESCE(s.side, 'neutral') AS side,
               COUNT(*) AS wallets
        FROM wallets w
        LEFT JOIN ({WALLET_SIDES_SQL}) s ON s.wallet_address = w.address
        WHERE w.category IS NOT NULL
          AND (?1 IS NULL OR s.wallet_address IS NOT NULL)
        GROUP BY w.category, COALESCE(s.side, 'neutral')
        "#
    );

    let rows: Vec<(SizeCategory, Side, i64)> = sqlx::query_as(&sql)
        .bind(coin)
        .fetch_all(pool)
        .await?;

    let mut stats = WalletStatistics::new();
    for (category, side, count) in rows {
        *stats.entry(category).or_default().entry(side).or_insert(0) += count;
    }

    Ok(stats)
}
