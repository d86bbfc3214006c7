//! Denominated token amounts.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AmountError;

/// Maximum denom length in bytes.
pub const MAX_DENOM_LEN: usize = 128;

/// An amount of a single denomination, e.g. `100stake`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

/// Checks a denom: starts with a letter, 3..=128 chars of `[A-Za-z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> bool {
    let bytes = denom.as_bytes();
    if bytes.len() < 3 || bytes.len() > MAX_DENOM_LEN {
        return false;
    }
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'))
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(0, denom)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_valid(&self) -> bool {
        validate_denom(&self.denom)
    }

    fn same_denom(&self, other: &Coin) -> Result<(), AmountError> {
        if self.denom != other.denom {
            return Err(AmountError::DenomMismatch {
                left: self.denom.clone(),
                right: other.denom.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Coin) -> Result<Coin, AmountError> {
        self.same_denom(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(AmountError::Overflow)?;
        Ok(Coin::new(amount, self.denom.clone()))
    }

    pub fn checked_sub(&self, other: &Coin) -> Result<Coin, AmountError> {
        self.same_denom(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(AmountError::Underflow)?;
        Ok(Coin::new(amount, self.denom.clone()))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, denom) = s.split_at(split);
        if digits.is_empty() || !validate_denom(denom) {
            return Err(AmountError::Parse(alloc::format!("invalid coin: {:?}", s)));
        }
        let amount = digits.parse::<u128>().map_err(|_| AmountError::Overflow)?;
        Ok(Coin::new(amount, denom))
    }
}

impl Serialize for Coin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display() {
        let coin: Coin = "100stake".parse().unwrap();
        assert_eq!(coin, Coin::new(100, "stake"));
        assert_eq!(coin.to_string(), "100stake");
    }

    #[test]
    fn test_parse_rejects_bad_coins() {
        for bad in ["stake", "100", "100 stake", "10s", "1x!y"] {
            assert!(bad.parse::<Coin>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_arithmetic_requires_same_denom() {
        let a = Coin::new(10, "stake");
        let b = Coin::new(3, "atom");
        assert!(matches!(a.checked_add(&b), Err(AmountError::DenomMismatch { .. })));
        assert!(a.checked_sub(&b).is_err());
    }

    #[test]
    fn test_checked_sub_underflow() {
        let a = Coin::new(10, "stake");
        let b = Coin::new(11, "stake");
        assert_eq!(a.checked_sub(&b), Err(AmountError::Underflow));
        assert_eq!(b.checked_sub(&a), Ok(Coin::new(1, "stake")));
    }

    #[test]
    fn test_checked_add_overflow() {
        let a = Coin::new(u128::MAX, "stake");
        let b = Coin::new(1, "stake");
        assert_eq!(a.checked_add(&b), Err(AmountError::Overflow));
    }

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("stake"));
        assert!(validate_denom("ibc/27394FB092D2ECCD"));
        assert!(!validate_denom("1stake"));
        assert!(!validate_denom("ab"));
    }
}
