use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

/// One open perpetual position as reported by the position feed.
///
/// Ephemeral: only the per-wallet aggregate and snapshot rows are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub account: String,
    pub is_long: bool,
    pub size_usd: Decimal,
    pub market: String,
}

impl Position {
    pub fn side(&self) -> Side {
        Side::from_is_long(self.is_long)
    }
}

/// Database row for the wallet_positions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub id: Uuid,
    pub wallet_address: String,
    pub coin: String,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Option<Decimal>,
    pub leverage: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub last_checked: DateTime<Utc>,
}

impl PositionSnapshot {
    /// Snapshot a feed position for `wallet_address`. The feed carries no
    /// entry price, leverage or PnL, so those stay empty.
    pub fn from_position(
        wallet_address: &str,
        position: &Position,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_string(),
            coin: position.market.clone(),
            side: position.side(),
            size: position.size_usd.abs(),
            entry_price: None,
            leverage: None,
            unrealized_pnl: None,
            last_checked: checked_at,
        }
    }
}
