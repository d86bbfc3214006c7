//! Shared test helpers for integration tests.
//!
//! Provides deterministic keypairs, transaction builders, funded ledgers,
//! and engine factories used across all integration test files.

#![allow(dead_code)]

use blocklane_engine::{AuctionParams, BlockEngine, EngineConfig};
use blocklane_ledger::MemLedger;
use blocklane_primitives::{
    crypto::{deterministic_keypair, tx_hash},
    Address, Coin, Hash, Msg, MsgAuctionBid, TxBody,
};
use ed25519_dalek::SigningKey;

pub type Key = (Address, SigningKey);

/// Governance authority configured in every test engine.
pub const AUTHORITY: Address = [0x60; 32];
pub const ESCROW: Address = [0xe5; 32];
pub const PROPOSER: Address = [0x70; 32];
pub const VALIDATOR: Address = [0x7a; 32];

/// Height of the block under construction.
pub const HEIGHT: u64 = 10;
/// Timeout used for bids that should stay live for a while.
pub const TIMEOUT: u64 = 20;

pub const MAX_BYTES: u64 = 1_000_000;
pub const MAX_GAS: u64 = 100_000_000;

pub const GAS: u64 = 50_000;

// ── Deterministic Keypairs ──

/// Alice: seed=1, stable address across all tests.
pub fn alice() -> Key {
    deterministic_keypair(1)
}

/// Bob: seed=2, stable address across all tests.
pub fn bob() -> Key {
    deterministic_keypair(2)
}

/// Charlie: seed=3, stable address across all tests.
pub fn charlie() -> Key {
    deterministic_keypair(3)
}

// ── Transaction Encoding ──

pub fn signed(key: &Key, nonce: u64, fee: u128, timeout_height: u64, msgs: Vec<Msg>) -> Vec<u8> {
    TxBody {
        signer: key.0,
        nonce,
        fee: Coin::new(fee, "stake"),
        gas_limit: GAS,
        timeout_height,
        msgs,
    }
    .sign(&key.1)
}

/// A bank send paying `fee` stake.
pub fn send_tx(key: &Key, nonce: u64, to: &Address, amount: u128, fee: u128) -> Vec<u8> {
    let msg = Msg::Send {
        to: *to,
        amount: Coin::new(amount, "stake"),
    };
    signed(key, nonce, fee, 0, vec![msg])
}

/// A fee-exempt delegation.
pub fn delegate_tx(key: &Key, nonce: u64, amount: u128) -> Vec<u8> {
    let msg = Msg::Delegate {
        validator: VALIDATOR,
        amount: Coin::new(amount, "stake"),
    };
    signed(key, nonce, 0, 0, vec![msg])
}

/// A bid of `amount` stake for `bundle`, signed by the bidder.
pub fn bid_tx(
    key: &Key,
    nonce: u64,
    amount: u128,
    timeout_height: u64,
    bundle: Vec<Vec<u8>>,
) -> Vec<u8> {
    signed(
        key,
        nonce,
        1,
        timeout_height,
        vec![Msg::AuctionBid(MsgAuctionBid {
            bidder: key.0,
            bid: Coin::new(amount, "stake"),
            transactions: bundle,
        })],
    )
}

pub fn hash(raw: &[u8]) -> Hash {
    tx_hash(raw)
}

// ── State Helpers ──

/// Ledger where each account holds `amount` stake.
pub fn funded_ledger(accounts: &[Address], amount: u128) -> MemLedger {
    let mut ledger = MemLedger::new();
    for account in accounts {
        ledger.set_balance(*account, Coin::new(amount, "stake"));
    }
    ledger
}

pub fn everyone_funded() -> MemLedger {
    funded_ledger(&[alice().0, bob().0, charlie().0], 10_000)
}

// ── Engine Factories ──

/// `max_bundle_size 3, reserve 100stake, increment 10stake, proposer fee 0.05`.
pub fn scenario_params() -> AuctionParams {
    AuctionParams {
        max_bundle_size: 3,
        reserve_fee: Coin::new(100, "stake"),
        min_bid_increment: Coin::new(10, "stake"),
        proposer_fee: "0.05".parse().unwrap(),
        escrow_account: ESCROW,
        front_running_protection: true,
        cleared_bid_retention: 1_000,
    }
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.authority = AUTHORITY;
    config.genesis.params = scenario_params();
    config
}

pub fn engine() -> BlockEngine {
    BlockEngine::new(test_config()).unwrap()
}

pub fn engine_with(adjust: impl FnOnce(&mut EngineConfig)) -> BlockEngine {
    let mut config = test_config();
    adjust(&mut config);
    BlockEngine::new(config).unwrap()
}
