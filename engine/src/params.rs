//! Governance-controlled auction parameters.

use serde::{Deserialize, Serialize};

use blocklane_primitives::{types::hex_address, Address, Coin, Decimal, ZERO_ADDRESS};

use crate::error::EngineError;

/// Blocks a cleared bid stays in the increment history.
pub const DEFAULT_CLEARED_BID_RETENTION: u64 = 1_000;

fn default_cleared_bid_retention() -> u64 {
    DEFAULT_CLEARED_BID_RETENTION
}

/// Auction parameters, read at validation and clearing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    /// Maximum number of transactions in a bundle.
    pub max_bundle_size: u32,
    /// Minimum acceptable bid.
    pub reserve_fee: Coin,
    /// Minimum amount a rebid on an identical bundle must add.
    pub min_bid_increment: Coin,
    /// Share of the winning bid paid to the proposer, in `[0, 1]`.
    pub proposer_fee: Decimal,
    /// Receives the non-proposer share of the winning bid.
    #[serde(with = "hex_address")]
    pub escrow_account: Address,
    /// Reject bundles that wrap other signers' transactions.
    pub front_running_protection: bool,
    /// Blocks after its last clearing that a bid still binds the
    /// increment rule.
    #[serde(default = "default_cleared_bid_retention")]
    pub cleared_bid_retention: u64,
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            max_bundle_size: 2,
            reserve_fee: Coin::new(1, "stake"),
            min_bid_increment: Coin::new(1, "stake"),
            proposer_fee: Decimal::ZERO,
            escrow_account: ZERO_ADDRESS,
            front_running_protection: true,
            cleared_bid_retention: DEFAULT_CLEARED_BID_RETENTION,
        }
    }
}

impl AuctionParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_bundle_size == 0 {
            return Err(EngineError::InvalidParams("max_bundle_size must be positive".into()));
        }
        if !self.reserve_fee.is_valid() {
            return Err(EngineError::InvalidParams(format!(
                "invalid reserve fee denom {:?}",
                self.reserve_fee.denom
            )));
        }
        if self.reserve_fee.denom != self.min_bid_increment.denom {
            return Err(EngineError::InvalidParams(format!(
                "reserve fee denom {:?} differs from min bid increment denom {:?}",
                self.reserve_fee.denom, self.min_bid_increment.denom
            )));
        }
        if self.cleared_bid_retention == 0 {
            return Err(EngineError::InvalidParams("cleared_bid_retention must be positive".into()));
        }
        if !self.proposer_fee.is_unit_interval() {
            return Err(EngineError::InvalidParams(format!(
                "proposer fee {} outside [0, 1]",
                self.proposer_fee
            )));
        }
        Ok(())
    }

    /// Denom every bid must be paid in.
    pub fn bid_denom(&self) -> &str {
        &self.reserve_fee.denom
    }
}
