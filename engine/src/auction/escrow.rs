//! Escrow distributor: splits a winning bid between the proposer and the
//! escrow account.

use tracing::debug;

use blocklane_ledger::LedgerMut;
use blocklane_primitives::{types::short_hex, Address, Coin, Decimal};

use crate::error::EngineError;
use crate::params::AuctionParams;

/// How a winning bid is divided. The two legs always sum to the bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowSplit {
    pub escrow: Coin,
    pub proposer: Coin,
}

/// Proposer receives `floor(bid * proposer_fee)`; escrow gets the rest.
pub fn distribute(bid: &Coin, proposer_fee: Decimal) -> Result<EscrowSplit, EngineError> {
    if !proposer_fee.is_unit_interval() {
        return Err(EngineError::InvalidParams(format!(
            "proposer fee {} outside [0, 1]",
            proposer_fee
        )));
    }
    let proposer_amount = proposer_fee
        .mul_floor(bid.amount)
        .ok_or_else(|| EngineError::InvalidParams("proposer share overflows".into()))?;
    // proposer_amount <= bid.amount because the fee is at most one.
    let escrow_amount = bid.amount - proposer_amount;
    Ok(EscrowSplit {
        escrow: Coin::new(escrow_amount, bid.denom.clone()),
        proposer: Coin::new(proposer_amount, bid.denom.clone()),
    })
}

/// Pay a winning bid out of `bidder`.
///
/// The bidder's balance is checked before any transfer; if the second
/// leg fails the first is reversed. Zero-amount legs are skipped.
pub fn settle_bid(
    ledger: &mut dyn LedgerMut,
    bidder: &Address,
    bid: &Coin,
    proposer: &Address,
    params: &AuctionParams,
) -> Result<EscrowSplit, EngineError> {
    let split = distribute(bid, params.proposer_fee)?;

    let available = ledger.balance(bidder, &bid.denom)?;
    if available < bid.amount {
        return Err(EngineError::InsufficientFunds {
            address: *bidder,
            denom: bid.denom.clone(),
            available,
            required: bid.amount,
        });
    }

    if !split.escrow.is_zero() {
        ledger.transfer(bidder, &params.escrow_account, &split.escrow)?;
    }
    if !split.proposer.is_zero() {
        if let Err(err) = ledger.transfer(bidder, proposer, &split.proposer) {
            if !split.escrow.is_zero() {
                ledger.transfer(&params.escrow_account, bidder, &split.escrow)?;
            }
            return Err(err.into());
        }
    }

    debug!(
        bidder = %short_hex(bidder),
        escrow = %split.escrow,
        proposer = %split.proposer,
        "bid settled"
    );
    Ok(split)
}
