use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places between the network's display unit and its smallest unit.
pub const ETHER_DECIMALS: usize = 18;
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

//--------------------------------------        Wei          ---------------------------------------------------------
/// An on-chain amount in the network's smallest unit.
///
/// All conversions are exact integer arithmetic. Decimal strings (e.g. the configured platform fee `"0.1"`) are parsed
/// digit by digit, and hex quantities from JSON-RPC responses are parsed directly into a `u128`. Amounts are
/// serialized as decimal wei strings so that no JSON consumer ever sees them as a lossy float.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented in wei: {0}")]
pub struct WeiConversionError(String);

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Wei {
    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn from_ether(ether: u64) -> Self {
        Self(u128::from(ether) * WEI_PER_ETHER)
    }

    /// Parses a JSON-RPC hex quantity such as `0x16345785d8a0000`.
    pub fn from_hex_quantity(value: &str) -> Result<Self, WeiConversionError> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| WeiConversionError(format!("{value} is not a 0x-prefixed hex quantity")))?;
        if digits.is_empty() {
            return Err(WeiConversionError(format!("{value} has no digits")));
        }
        // from_str_radix tolerates a leading sign, which is not part of the quantity encoding
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(WeiConversionError(format!("{value} contains characters that are not hex digits")));
        }
        u128::from_str_radix(digits, 16).map(Self).map_err(|e| WeiConversionError(format!("{value}: {e}")))
    }

    /// Parses a decimal amount in display units (e.g. `"0.1"` or `"12"`) into wei.
    ///
    /// Fails rather than rounding when the value has more than [`ETHER_DECIMALS`] fractional digits.
    pub fn from_ether_str(value: &str) -> Result<Self, WeiConversionError> {
        let value = value.trim();
        let (whole, fraction) = match value.split_once('.') {
            Some((w, f)) => (w, f),
            None => (value, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(WeiConversionError(format!("'{value}' is not a decimal amount")));
        }
        if fraction.len() > ETHER_DECIMALS {
            return Err(WeiConversionError(format!("'{value}' has more than {ETHER_DECIMALS} decimal places")));
        }
        let overflow = || WeiConversionError(format!("'{value}' is too large"));
        let whole = if whole.is_empty() { 0 } else { whole.parse::<u128>().map_err(|_| overflow())? };
        let fraction = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<width$}", width = ETHER_DECIMALS);
            padded.parse::<u128>().map_err(|_| overflow())?
        };
        whole.checked_mul(WEI_PER_ETHER).and_then(|w| w.checked_add(fraction)).map(Self).ok_or_else(overflow)
    }

    /// The decimal wei string, as stored in the database.
    pub fn to_wei_string(&self) -> String {
        self.0.to_string()
    }

    pub fn from_wei_str(value: &str) -> Result<Self, WeiConversionError> {
        value.trim().parse::<u128>().map(Self).map_err(|e| WeiConversionError(format!("'{value}': {e}")))
    }
}

/// Displays the amount in whole network units, with trailing fractional zeros removed.
impl Display for Wei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / WEI_PER_ETHER;
        let fraction = self.0 % WEI_PER_ETHER;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let fraction = format!("{fraction:0>width$}", width = ETHER_DECIMALS);
        write!(f, "{whole}.{}", fraction.trim_end_matches('0'))
    }
}

impl FromStr for Wei {
    type Err = WeiConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ether_str(s)
    }
}

impl TryFrom<String> for Wei {
    type Error = WeiConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_wei_str(&value)
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.to_wei_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_platform_fee() {
        let fee = Wei::from_ether_str("0.1").unwrap();
        assert_eq!(fee.value(), 100_000_000_000_000_000);
        assert_eq!(Wei::from_ether_str("1").unwrap(), Wei::from_ether(1));
        assert_eq!(Wei::from_ether_str(".5").unwrap().value(), WEI_PER_ETHER / 2);
        assert_eq!(Wei::from_ether_str("0.000000000000000001").unwrap().value(), 1);
    }

    #[test]
    fn reject_unrepresentable_decimals() {
        assert!(Wei::from_ether_str("0.0000000000000000001").is_err());
        assert!(Wei::from_ether_str("1e18").is_err());
        assert!(Wei::from_ether_str("-1").is_err());
        assert!(Wei::from_ether_str("").is_err());
        assert!(Wei::from_ether_str(".").is_err());
        assert!(Wei::from_ether_str("1.2.3").is_err());
    }

    #[test]
    fn hex_quantities() {
        assert_eq!(Wei::from_hex_quantity("0x16345785d8a0000").unwrap(), Wei::from_ether_str("0.1").unwrap());
        assert_eq!(Wei::from_hex_quantity("0x0").unwrap(), Wei::default());
        assert!(Wei::from_hex_quantity("0x").is_err());
        assert!(Wei::from_hex_quantity("1234").is_err());
        assert!(Wei::from_hex_quantity("0xnothex").is_err());
        assert!(Wei::from_hex_quantity("0x+16345785d8a0000").is_err());
        assert!(Wei::from_hex_quantity("0x-1").is_err());
        assert!(Wei::from_hex_quantity("0x 1").is_err());
        // 33 hex digits overflows u128
        assert!(Wei::from_hex_quantity("0x100000000000000000000000000000000").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Wei::from_ether(3).to_string(), "3");
        assert_eq!(Wei::from_ether_str("0.1").unwrap().to_string(), "0.1");
        assert_eq!(Wei::from(1).to_string(), "0.000000000000000001");
        assert_eq!(Wei::from_ether_str("12.0500").unwrap().to_string(), "12.05");
    }

    #[test]
    fn fee_comparison_is_exact() {
        let fee = Wei::from_ether_str("0.1").unwrap();
        let just_under = Wei::from(fee.value() - 1);
        assert!(just_under < fee);
        assert!(Wei::from(fee.value() + 1) > fee);
    }

    #[test]
    fn serializes_as_wei_string() {
        let fee = Wei::from_ether_str("0.1").unwrap();
        let json = serde_json::to_string(&fee).unwrap();
        assert_eq!(json, "\"100000000000000000\"");
        let back: Wei = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fee);
    }
}
