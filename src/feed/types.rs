use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::models::Position;

// ---------------------------------------------------------------------------
// GraphQL envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// Positions query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsData {
    #[serde(default)]
    pub positions: Vec<ApiPosition>,
}

/// Wire shape of one position. Field names are fixed by the indexer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiPosition {
    pub account: String,
    #[serde(rename = "isLong")]
    pub is_long: bool,
    #[serde(rename = "sizeInUsd")]
    pub size_in_usd: RawAmount,
    pub market: String,
}

impl ApiPosition {
    /// Convert to a domain position, shifting `sizeInUsd` right by
    /// `size_decimals` places (indexers often report fixed-point integers).
    pub fn into_position(self, size_decimals: u32) -> Result<Position, String> {
        let size_usd = self.size_in_usd.to_decimal(size_decimals)?;
        Ok(Position {
            account: self.account,
            is_long: self.is_long,
            size_usd,
            market: self.market,
        })
    }
}

/// Amount kept as its textual form until scaled. Accepts a JSON string or
/// number; fixed-point integers can exceed `Decimal`'s 96-bit range before
/// scaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawAmount(pub String);

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(RawAmount(s)),
            serde_json::Value::Number(n) => Ok(RawAmount(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected amount as string or number, got {other}"
            ))),
        }
    }
}

/// Fractional digits kept after scaling.
const MAX_FRACTION_DIGITS: usize = 18;

/// Largest supported number of implied decimals in a raw amount.
pub const MAX_SIZE_DECIMALS: u32 = 60;

impl RawAmount {
    pub fn to_decimal(&self, decimals: u32) -> Result<Decimal, String> {
        if decimals > MAX_SIZE_DECIMALS {
            return Err(format!(
                "{decimals} implied decimals exceeds the supported {MAX_SIZE_DECIMALS}"
            ));
        }
        let raw = self.0.trim();
        if raw.contains(['e', 'E']) {
            let value = Decimal::from_scientific(raw).map_err(|e| format!("{raw}: {e}"))?;
            return Ok(shift_scientific(value, decimals));
        }

        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if (int_part.is_empty() && frac_part.is_empty())
            || !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(format!("not a decimal amount: {raw:?}"));
        }

        // Move the decimal point `decimals` places to the left.
        let digits = format!("{int_part}{frac_part}");
        let point = int_part.len() as i64 - i64::from(decimals);
        let (int_digits, frac_digits) = if point <= 0 {
            let padding = "0".repeat(point.unsigned_abs() as usize);
            (String::from("0"), format!("{padding}{digits}"))
        } else {
            let point = point as usize;
            (digits[..point].to_string(), digits[point..].to_string())
        };

        let frac_digits = &frac_digits[..frac_digits.len().min(MAX_FRACTION_DIGITS)];
        let int_digits = int_digits.trim_start_matches('0');
        let text = format!(
            "{}{}.{}",
            if negative { "-" } else { "" },
            if int_digits.is_empty() { "0" } else { int_digits },
            if frac_digits.is_empty() { "0" } else { frac_digits },
        );

        Decimal::from_str(&text)
            .map(|d| d.normalize())
            .map_err(|e| format!("{raw}: {e}"))
    }
}

fn shift_scientific(value: Decimal, decimals: u32) -> Decimal {
    let mut out = value;
    for _ in 0..decimals {
        out /= Decimal::TEN;
    }
    out.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(raw: &str, decimals: u32) -> Decimal {
        RawAmount(raw.to_string()).to_decimal(decimals).unwrap()
    }

    #[test]
    fn test_plain_amounts() {
        assert_eq!(amount("5000", 0), Decimal::from(5_000));
        assert_eq!(amount("1234.56", 0), Decimal::new(123_456, 2));
        assert_eq!(amount("-42", 0), Decimal::from(-42));
    }

    #[test]
    fn test_fixed_point_amounts_are_scaled() {
        // 2,000,000 USD with 30 implied decimals overflows Decimal unscaled.
        let raw = format!("2000000{}", "0".repeat(30));
        assert_eq!(amount(&raw, 30), Decimal::from(2_000_000));
        assert_eq!(amount("5", 3), Decimal::new(5, 3));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RawAmount("abc".into()).to_decimal(0).is_err());
        assert!(RawAmount("".into()).to_decimal(0).is_err());
    }

    #[test]
    fn test_rejects_excessive_decimals() {
        assert!(RawAmount("5".into()).to_decimal(MAX_SIZE_DECIMALS).is_ok());
        assert!(RawAmount("5".into()).to_decimal(u32::MAX).is_err());
    }

    #[test]
    fn test_deserializes_string_or_number() {
        let p: ApiPosition = serde_json::from_str(
            r#"{"account":"0xAA","isLong":true,"sizeInUsd":5000,"market":"ETH"}"#,
        )
        .unwrap();
        assert_eq!(p.size_in_usd, RawAmount("5000".into()));

        let p: ApiPosition = serde_json::from_str(
            r#"{"account":"0xAA","isLong":false,"sizeInUsd":"5000.5","market":"ETH"}"#,
        )
        .unwrap();
        assert_eq!(p.into_position(0).unwrap().size_usd, Decimal::new(50_005, 1));
    }
}
