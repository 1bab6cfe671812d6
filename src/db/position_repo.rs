use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::StoreError;
use crate::models::{PositionSnapshot, Side};

/// SQLite has no decimal type; amounts are stored as text.
#[derive(Debug, FromRow)]
struct PositionRow {
    id: Uuid,
    wallet_address: String,
    coin: String,
    side: Side,
    size: String,
    entry_price: Option<String>,
    leverage: Option<String>,
    unrealized_pnl: Option<String>,
    last_checked: DateTime<Utc>,
}

impl TryFrom<PositionRow> for PositionSnapshot {
    type Error = StoreError;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(PositionSnapshot {
            id: row.id,
            size: parse_decimal(&row.size)?,
            entry_price: row.entry_price.as_deref().map(parse_decimal).transpose()?,
            leverage: row.leverage.as_deref().map(parse_decimal).transpose()?,
            unrealized_pnl: row.unrealized_pnl.as_deref().map(parse_decimal).transpose()?,
            wallet_address: row.wallet_address,
            coin: row.coin,
            side: row.side,
            last_checked: row.last_checked,
        })
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt(format!("bad decimal {raw:?}: {e}")))
}

/// Replace every snapshot of a wallet with `snapshots` in one transaction.
pub async fn replace_wallet_positions(
    pool: &SqlitePool,
    address: &str,
    snapshots: &[PositionSnapshot],
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM wallet_positions WHERE wallet_address = ?1")
        .bind(address)
        .execute(&mut *tx)
        .await?;

    for snap in snapshots {
        sqlx::query(
            r#"
            INSERT INTO wallet_positions
                (id, wallet_address, coin, side, size, entry_price, leverage, unrealized_pnl, last_checked)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(snap.id)
        .bind(address)
        .bind(&snap.coin)
        .bind(snap.side)
        .bind(snap.size.to_string())
        .bind(snap.entry_price.map(|d| d.to_string()))
        .bind(snap.leverage.map(|d| d.to_string()))
        .bind(snap.unrealized_pnl.map(|d| d.to_string()))
        .bind(snap.last_checked)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Snapshots of one wallet, largest first.
pub async fn get_positions_by_wallet(
    pool: &SqlitePool,
    address: &str,
) -> Result<Vec<PositionSnapshot>, StoreError> {
    let rows = sqlx::query_as::<_, PositionRow>(
        "SELECT * FROM wallet_positions WHERE wallet_address = ?1 ORDER BY coin ASC",
    )
    .bind(address)
    .fetch_all(pool)
    .await?;

    let mut snapshots = rows
        .into_iter()
        .map(PositionSnapshot::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    snapshots.sort_by(|a, b| b.size.cmp(&a.size));

    Ok(snapshots)
}
