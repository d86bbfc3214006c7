//! Simulated balance changes layered over a read-only ledger.
//!
//! The overlay buffers debits and credits so a sequence of transactions
//! can be checked for solvency without touching the ledger. Reads see
//! committed balances plus everything buffered so far. Dropping the
//! overlay discards the simulation.

use std::collections::BTreeMap;

use blocklane_primitives::{Address, Coin};

use crate::error::LedgerError;
use crate::traits::Ledger;

/// Write buffer of simulated balances over a [`Ledger`].
///
/// Uses `BTreeMap` so [`changes`](Self::changes) iterates deterministically.
pub struct BalanceOverlay<'a> {
    base: &'a dyn Ledger,
    /// Simulated balance per (account, denom); absent entries fall through to `base`.
    balances: BTreeMap<(Address, String), u128>,
}

impl<'a> BalanceOverlay<'a> {
    pub fn new(base: &'a dyn Ledger) -> Self {
        Self {
            base,
            balances: BTreeMap::new(),
        }
    }

    /// Balance as seen by the simulation.
    pub fn balance(&self, address: &Address, denom: &str) -> Result<u128, LedgerError> {
        match self.balances.get(&(*address, denom.to_string())) {
            Some(amount) => Ok(*amount),
            None => self.base.balance(address, denom),
        }
    }

    /// Remove `coin` from `address`, failing without change if it cannot pay.
    pub fn debit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        if coin.is_zero() {
            return Ok(());
        }
        let available = self.balance(address, &coin.denom)?;
        let remaining = available
            .checked_sub(coin.amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                address: *address,
                denom: coin.denom.clone(),
                available,
                required: coin.amount,
            })?;
        self.balances.insert((*address, coin.denom.clone()), remaining);
        Ok(())
    }

    /// Add `coin` to `address`.
    pub fn credit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        if coin.is_zero() {
            return Ok(());
        }
        let current = self.balance(address, &coin.denom)?;
        let next = current
            .checked_add(coin.amount)
            .ok_or(LedgerError::Overflow(*address))?;
        self.balances.insert((*address, coin.denom.clone()), next);
        Ok(())
    }

    /// Debit `from` and credit `to`; on failure neither side changes.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        if from == to {
            let available = self.balance(from, &coin.denom)?;
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
        let snapshot = self.balances.clone();
        self.debit(from, coin)?;
        if let Err(err) = self.credit(to, coin) {
            self.balances = snapshot;
            return Err(err);
        }
        Ok(())
    }

    /// All simulated balances, sorted by (account, denom).
    pub fn changes(&self) -> &BTreeMap<(Address, String), u128> {
        &self.balances
    }

    /// Number of (account, denom) pairs touched.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
