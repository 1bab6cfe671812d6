use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::SizeCategory;

/// Database row for the wallets table. `address` is the canonical
/// (lower-case) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub address: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub category: Option<SizeCategory>,
    pub last_position_check: Option<DateTime<Utc>>,
    /// Last classification attempt, including ones that found no positions.
    pub last_check_attempt: Option<DateTime<Utc>>,
}
