//! Fixed-point decimal used for block-space fractions and fee shares.
//!
//! Values are stored as an integer count of 10^-18 units, so every
//! operation is exact integer arithmetic and identical on every node.
//! There is no floating point anywhere in this type.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AmountError;

/// Number of fractional digits.
pub const DECIMAL_PLACES: u32 = 18;

/// 10^18, the fixed-point scale.
const SCALE: u128 = 1_000_000_000_000_000_000;

/// Non-negative fixed-point number with 18 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(u128);

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);
    pub const ONE: Decimal = Decimal(SCALE);

    /// Build from raw 10^-18 units.
    pub const fn from_atomics(atomics: u128) -> Self {
        Self(atomics)
    }

    /// `numerator / 10^places`, e.g. `from_ratio_pow10(5, 2)` is `0.05`.
    pub fn from_ratio_pow10(numerator: u128, places: u32) -> Option<Self> {
        if places > DECIMAL_PLACES {
            return None;
        }
        numerator
            .checked_mul(10u128.pow(DECIMAL_PLACES - places))
            .map(Self)
    }

    /// Raw 10^-18 units.
    pub fn atomics(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True when the value lies in `[0, 1]`.
    pub fn is_unit_interval(&self) -> bool {
        self.0 <= SCALE
    }

    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        self.0.checked_add(other.0).map(Decimal)
    }

    /// `floor(amount * self)`.
    ///
    /// Splits `amount` around the scale so the intermediate product stays
    /// within `u128` for any fraction up to one.
    pub fn mul_floor(&self, amount: u128) -> Option<u128> {
        let whole = amount / SCALE;
        let rem = amount % SCALE;
        let high = whole.checked_mul(self.0)?;
        let low = rem.checked_mul(self.0)? / SCALE;
        high.checked_add(low)
    }

    /// `floor(amount * self)` for `u64` capacities such as bytes or gas.
    pub fn mul_floor_u64(&self, amount: u64) -> Option<u64> {
        let product = self.mul_floor(amount as u128)?;
        u64::try_from(product).ok()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let mut digits = alloc::format!("{:018}", frac);
        while digits.ends_with('0') {
            digits.pop();
        }
        write!(f, "{}.{}", whole, digits)
    }
}

impl FromStr for Decimal {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || AmountError::Parse(alloc::format!("invalid decimal: {:?}", s));
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err());
        }
        if frac.len() > DECIMAL_PLACES as usize || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err());
        }
        if s.contains('.') && frac.is_empty() {
            return Err(parse_err());
        }

        let whole: u128 = whole.parse().map_err(|_| parse_err())?;
        let mut frac_units: u128 = 0;
        if !frac.is_empty() {
            let value: u128 = frac.parse().map_err(|_| parse_err())?;
            frac_units = value * 10u128.pow(DECIMAL_PLACES - frac.len() as u32);
        }
        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac_units))
            .map(Decimal)
            .ok_or(AmountError::Overflow)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
