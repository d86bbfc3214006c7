//! Ledger error type.

use blocklane_primitives::{types::short_hex, Address};

/// Failure of a ledger read or transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The account cannot cover a debit.
    #[error(
        "insufficient funds for {}: have {available}{denom}, need {required}{denom}",
        short_hex(.address)
    )]
    InsufficientFunds {
        address: Address,
        denom: String,
        available: u128,
        required: u128,
    },

    /// A credit would overflow the account balance.
    #[error("balance overflow for {}", short_hex(.0))]
    Overflow(Address),

    /// The backing store failed or is unreachable.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_display() {
        let err = LedgerError::InsufficientFunds {
            address: [0xab; 32],
            denom: "stake".into(),
            available: 5,
            required: 10,
        };
        let s = err.to_string();
        assert!(s.contains("abababab"));
        assert!(s.contains("5stake"));
        assert!(s.contains("10stake"));
    }

    #[test]
    fn test_unavailable_display() {
        let err = LedgerError::Unavailable("disk full".into());
        assert!(err.to_string().contains("disk full"));
    }
}
