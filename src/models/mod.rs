pub mod position;
pub mod wallet;

pub use position::{Position, PositionSnapshot};
pub use wallet::Wallet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// SizeCategory
// ---------------------------------------------------------------------------

/// USD-exposure tier of a wallet.
///
/// Tiers partition `[0, ∞)`: each lower bound is inclusive, each upper bound
/// exclusive, so a boundary value always lands in the higher tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SizeCategory {
    Micro,
    Small,
    Medium,
    Large,
    Whale,
    MegaWhale,
}

impl SizeCategory {
    pub const ALL: [SizeCategory; 6] = [
        SizeCategory::Micro,
        SizeCategory::Small,
        SizeCategory::Medium,
        SizeCategory::Large,
        SizeCategory::Whale,
        SizeCategory::MegaWhale,
    ];

    /// Inclusive lower bound in USD.
    pub fn lower_bound(&self) -> Decimal {
        match self {
            SizeCategory::Micro => Decimal::ZERO,
            SizeCategory::Small => Decimal::from(1_000),
            SizeCategory::Medium => Decimal::from(10_000),
            SizeCategory::Large => Decimal::from(100_000),
            SizeCategory::Whale => Decimal::from(1_000_000),
            SizeCategory::MegaWhale => Decimal::from(10_000_000),
        }
    }

    /// Exclusive upper bound in USD. `None` for the open-ended top tier.
    pub fn upper_bound(&self) -> Option<Decimal> {
        match self {
            SizeCategory::MegaWhale => None,
            other => Some(other.next_lower_bound()),
        }
    }

    fn next_lower_bound(&self) -> Decimal {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL
            .get(idx + 1)
            .map(|c| c.lower_bound())
            .unwrap_or(Decimal::MAX)
    }

    /// True when `exposure_usd` falls inside this tier.
    pub fn contains(&self, exposure_usd: Decimal) -> bool {
        exposure_usd >= self.lower_bound()
            && self.upper_bound().map_or(true, |upper| exposure_usd < upper)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Micro => "micro",
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
            SizeCategory::Whale => "whale",
            SizeCategory::MegaWhale => "mega_whale",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SizeCategory::Micro => "Micro (<$1K)",
            SizeCategory::Small => "Small ($1K-$10K)",
            SizeCategory::Medium => "Medium ($10K-$100K)",
            SizeCategory::Large => "Large ($100K-$1M)",
            SizeCategory::Whale => "Whale ($1M-$10M)",
            SizeCategory::MegaWhale => "Mega Whale (>$10M)",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "micro" => Ok(SizeCategory::Micro),
            "small" => Ok(SizeCategory::Small),
            "medium" => Ok(SizeCategory::Medium),
            "large" => Ok(SizeCategory::Large),
            "whale" => Ok(SizeCategory::Whale),
            "mega_whale" | "megawhale" => Ok(SizeCategory::MegaWhale),
            other => Err(format!("unknown size category: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
    Neutral,
}

impl Side {
    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Side::Long
        } else {
            Side::Short
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
            Side::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            "neutral" => Ok(Side::Neutral),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Canonical form of a wallet address: trimmed and lower-cased.
///
/// Every address goes through this before touching a set or the store.
pub fn canonical_address(address: &str) -> String {
    address.trim().to_lowercase()
}
