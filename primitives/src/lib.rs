//! `blocklane-primitives`: foundational types for Blocklane.
//!
//! This crate provides hashes and addresses, denominated coins, the
//! fixed-point decimal used for fractions, the transaction wire format,
//! and the proposal types shared by the ledger and engine crates.
//!
//! Supports `#![no_std]` (use `default-features = false`); signing and
//! key generation need `std`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod types;
pub mod error;
pub mod coin;
pub mod decimal;
pub mod codec;
pub mod crypto;
pub mod tx;
pub mod block;

// Re-export commonly used types at the crate root for convenience.
pub use types::{Address, BlockHeight, Hash, ZERO_ADDRESS};
pub use error::{AmountError, CodecError};
pub use coin::Coin;
pub use decimal::Decimal;
pub use tx::{Msg, MsgAuctionBid, SignedTx, TxBody};
pub use block::{BlockTx, Proposal};
