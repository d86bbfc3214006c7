//! Error types for the primitives layer.
//!
//! Kept free of `std` so the crate builds without it; `std::error::Error`
//! is implemented when the `std` feature is on.

use alloc::string::String;
use core::fmt;

/// Failure to decode or encode a wire value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the value was complete.
    UnexpectedEnd,

    /// Input had bytes left over after the value was decoded.
    TrailingBytes(usize),

    /// Unknown message tag.
    UnknownMessage(u8),

    /// A string field was not UTF-8.
    InvalidUtf8,

    /// A structurally valid value violated a field constraint.
    InvalidField(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of data"),
            Self::TrailingBytes(n) => write!(f, "{} trailing bytes after value", n),
            Self::UnknownMessage(tag) => write!(f, "unknown message tag: 0x{:02x}", tag),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::InvalidField(msg) => write!(f, "invalid field: {}", msg),
        }
    }
}

/// Failure of a coin or decimal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Operands carry different denominations.
    DenomMismatch { left: String, right: String },

    /// Result does not fit the amount type.
    Overflow,

    /// Subtraction would go below zero.
    Underflow,

    /// String could not be parsed as an amount.
    Parse(String),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DenomMismatch { left, right } => {
                write!(f, "denom mismatch: {} vs {}", left, right)
            }
            Self::Overflow => write!(f, "amount overflow"),
            Self::Underflow => write!(f, "amount underflow"),
            Self::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}

#[cfg(feature = "std")]
impl std::error::Error for AmountError {}
