use rust_decimal::Decimal;

use crate::models::{Position, Side, SizeCategory};

/// Map a USD exposure to its size tier.
///
/// Lower bounds are inclusive: exactly $1,000 is `Small`, exactly $10,000 is
/// `Medium`, and so on. Negative input is treated as zero exposure.
pub fn classify_exposure(exposure_usd: Decimal) -> SizeCategory {
    let exposure = exposure_usd.max(Decimal::ZERO);

    SizeCategory::ALL
        .iter()
        .rev()
        .copied()
        .find(|cat| exposure >= cat.lower_bound())
        .unwrap_or(SizeCategory::Micro)
}

/// Sum of absolute position sizes in USD.
pub fn exposure_usd(positions: &[&Position]) -> Decimal {
    positions.iter().map(|p| p.size_usd.abs()).sum()
}

/// Dominant side by position count, not size. Equal counts are `Neutral`.
///
/// Positions across all markets are counted together, so a wallet long ETH
/// and short BTC is neutral regardless of how large either leg is.
pub fn dominant_side(positions: &[&Position]) -> Side {
    let longs = positions.iter().filter(|p| p.is_long).count();
    let shorts = positions.len() - longs;

    match longs.cmp(&shorts) {
        std::cmp::Ordering::Greater => Side::Long,
        std::cmp::Ordering::Less => Side::Short,
        std::cmp::Ordering::Equal => Side::Neutral,
    }
}

/// Positions whose account matches `address`, ignoring letter case.
pub fn positions_for<'a>(address: &str, positions: &'a [Position]) -> Vec<&'a Position> {
    let address = address.trim();
    positions
        .iter()
        .filter(|p| p.account.trim().eq_ignore_ascii_case(address))
        .collect()
}

/// Outcome of classifying one wallet against a position set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletProfile {
    pub exposure_usd: Decimal,
    pub category: SizeCategory,
    pub side: Side,
    pub position_count: usize,
}

/// Profile a wallet from the feed. `None` when it holds no open positions.
pub fn profile_wallet(address: &str, positions: &[Position]) -> Option<WalletProfile> {
    let matching = positions_for(address, positions);
    if matching.is_empty() {
        return None;
    }

    let exposure = exposure_usd(&matching);
    Some(WalletProfile {
        exposure_usd: exposure,
        category: classify_exposure(exposure),
        side: dominant_side(&matching),
        position_count: matching.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_position(account: &str, is_long: bool, size: i64, market: &str) -> Position {
        Position {
            account: account.to_string(),
            is_long,
            size_usd: Decimal::from(size),
            market: market.to_string(),
        }
    }

    fn usd(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            ("0", SizeCategory::Micro),
            ("999.99", SizeCategory::Micro),
            ("1000", SizeCategory::Small),
            ("9999.99", SizeCategory::Small),
            ("10000", SizeCategory::Medium),
            ("99999.99", SizeCategory::Medium),
            ("100000", SizeCategory::Large),
            ("999999.99", SizeCategory::Large),
            ("1000000", SizeCategory::Whale),
            ("9999999.99", SizeCategory::Whale),
            ("10000000", SizeCategory::MegaWhale),
            ("250000000000", SizeCategory::MegaWhale),
        ];

        for (raw, expected) in cases {
            assert_eq!(classify_exposure(usd(raw)), expected, "exposure {raw}");
        }
    }

    #[test]
    fn test_exactly_one_tier_contains_each_value() {
        let probes = [
            "0", "0.01", "999.999", "1000", "1000.01", "9999.99", "10000", "54321", "99999.99",
            "100000", "500000", "999999.99", "1000000", "9999999.99", "10000000", "1e12",
        ];

        for raw in probes {
            let value = Decimal::from_scientific(raw).or_else(|_| raw.parse()).unwrap();
            let containing: Vec<_> = SizeCategory::ALL
                .iter()
                .filter(|c| c.contains(value))
                .collect();
            assert_eq!(containing.len(), 1, "value {raw} in {containing:?}");
            assert_eq!(*containing[0], classify_exposure(value));
        }
    }

    #[test]
    fn test_negative_exposure_is_micro() {
        assert_eq!(classify_exposure(Decimal::from(-5)), SizeCategory::Micro);
    }

    #[test]
    fn test_three_long_one_short_is_long() {
        let positions = vec![
            make_position("0xa", true, 10, "ETH"),
            make_position("0xa", true, 10, "BTC"),
            make_position("0xa", true, 10, "SOL"),
            make_position("0xa", false, 1_000_000, "ARB"),
        ];
        let refs: Vec<&Position> = positions.iter().collect();
        assert_eq!(dominant_side(&refs), Side::Long);
    }

    #[test]
    fn test_tie_is_neutral_regardless_of_size() {
        let positions = vec![
            make_position("0xa", true, 1, "ETH"),
            make_position("0xa", true, 1, "BTC"),
            make_position("0xa", false, 900_000, "SOL"),
            make_position("0xa", false, 900_000, "ARB"),
        ];
        let refs: Vec<&Position> = positions.iter().collect();
        assert_eq!(dominant_side(&refs), Side::Neutral);
    }

    #[test]
    fn test_more_shorts_is_short() {
        let positions = vec![
            make_position("0xa", false, 1, "ETH"),
            make_position("0xa", false, 1, "BTC"),
            make_position("0xa", true, 1, "SOL"),
        ];
        let refs: Vec<&Position> = positions.iter().collect();
        assert_eq!(dominant_side(&refs), Side::Short);
    }

    #[test]
    fn test_positions_for_ignores_case() {
        let positions = vec![
            make_position("0xABC", true, 100, "ETH"),
            make_position("0xabc", false, 100, "BTC"),
            make_position("0xdef", true, 100, "ETH"),
        ];
        assert_eq!(positions_for("0xAbC", &positions).len(), 2);
    }

    #[test]
    fn test_profile_wallet() {
        let positions = vec![
            make_position("0xaa", true, 5_000, "ETH"),
            make_position("0xbb", false, 2_000_000, "BTC"),
        ];

        let aa = profile_wallet("0xaa", &positions).unwrap();
        assert_eq!(aa.category, SizeCategory::Small);
        assert_eq!(aa.side, Side::Long);
        assert_eq!(aa.exposure_usd, Decimal::from(5_000));

        let bb = profile_wallet("0xbb", &positions).unwrap();
        assert_eq!(bb.category, SizeCategory::Whale);
        assert_eq!(bb.side, Side::Short);

        assert!(profile_wallet("0xcc", &positions).is_none());
    }
}
