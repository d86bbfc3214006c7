//! In-memory ledger for tests and local tooling.
//!
//! `MemLedger` implements [`Ledger`] and [`LedgerMut`] over `BTreeMap`s so
//! iteration order is deterministic.

use std::collections::BTreeMap;

use blocklane_primitives::{Address, Coin};

use crate::error::LedgerError;
use crate::traits::{Ledger, LedgerMut};

/// In-memory balances and nonces.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    balances: BTreeMap<(Address, String), u128>,
    sequences: BTreeMap<Address, u64>,
}

impl MemLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance of `address` to `coin`, replacing any previous amount.
    pub fn set_balance(&mut self, address: Address, coin: Coin) {
        self.balances.insert((address, coin.denom), coin.amount);
    }

    /// Builder form of [`set_balance`](Self::set_balance).
    pub fn with_balance(mut self, address: Address, coin: Coin) -> Self {
        self.set_balance(address, coin);
        self
    }

    pub fn set_sequence(&mut self, address: Address, sequence: u64) {
        self.sequences.insert(address, sequence);
    }

    /// Advance the nonce of `address` by one, as executing one of its
    /// transactions would.
    pub fn bump_sequence(&mut self, address: &Address) {
        let next = self.sequences.get(address).copied().unwrap_or(0).saturating_add(1);
        self.sequences.insert(*address, next);
    }

    /// Sum of all balances in `denom`.
    pub fn supply(&self, denom: &str) -> u128 {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    fn get(&self, address: &Address, denom: &str) -> u128 {
        // BTreeMap lookups need an owned key for tuple keys.
        self.balances
            .get(&(*address, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Ledger for MemLedger {
    fn balance(&self, address: &Address, denom: &str) -> Result<u128, LedgerError> {
        Ok(self.get(address, denom))
    }

    fn sequence(&self, address: &Address) -> Result<u64, LedgerError> {
        Ok(self.sequences.get(address).copied().unwrap_or(0))
    }
}

impl LedgerMut for MemLedger {
    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        if from == to {
            let available = self.get(from, &coin.denom);
            if available < coin.amount {
                return Err(LedgerError::InsufficientFunds {
                    address: *from,
                    denom: coin.denom.clone(),
                    available,
                    required: coin.amount,
                });
            }
            return Ok(());
        }

        let from_balance = self.get(from, &coin.denom);
        let new_from = from_balance
            .checked_sub(coin.amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                address: *from,
                denom: coin.denom.clone(),
                available: from_balance,
                required: coin.amount,
            })?;
        let new_to = self
            .get(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or(LedgerError::Overflow(*to))?;

        // Both legs checked above; apply together.
        self.balances.insert((*from, coin.denom.clone()), new_from);
        self.balances.insert((*to, coin.denom.clone()), new_to);
        Ok(())
    }
}
