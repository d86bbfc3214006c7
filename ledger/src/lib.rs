//! `blocklane-ledger`: the account-state collaborator as seen by the engine.
//!
//! This crate provides:
//!
//! - `Ledger` / `LedgerMut` traits: balance and nonce reads, transfers
//! - `MemLedger`: in-memory implementation for testing
//! - `BalanceOverlay`: buffered balance simulation for solvency checks
//! - `LedgerError`: ledger failures

pub mod error;
pub mod traits;
pub mod mem_ledger;
pub mod overlay;

// Re-export commonly used types at the crate root.
pub use error::LedgerError;
pub use traits::{Ledger, LedgerMut};
pub use mem_ledger::MemLedger;
pub use overlay::BalanceOverlay;
