//! Ledger collaborator interfaces.
//!
//! The engine never owns balances. It reads them through [`Ledger`] when
//! validating bids and moves funds through [`LedgerMut`] when a winning
//! bid is settled. Implementations must be deterministic and must not
//! block: these calls run inside block construction.

use blocklane_primitives::{Address, Coin};

use crate::error::LedgerError;

/// Read access to account state.
pub trait Ledger: Send + Sync {
    /// Spendable balance of `address` in `denom`. Unknown accounts hold zero.
    fn balance(&self, address: &Address, denom: &str) -> Result<u128, LedgerError>;

    /// Next expected transaction nonce for `address`. Unknown accounts start at zero.
    fn sequence(&self, address: &Address) -> Result<u64, LedgerError>;
}

/// Write access to account state.
pub trait LedgerMut: Ledger {
    /// Move `coin` from `from` to `to`.
    ///
    /// Either both legs apply or neither does.
    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError>;
}
