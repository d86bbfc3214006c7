//! Auction lane: clears at most one bid per block.
//!
//! Bids are tried highest first. A bid that fails validation or repeats a
//! cleared bundle without the minimum increment is evicted; a valid bid
//! that does not fit the lane budget stays pending. The first bid that
//! passes and fits wins, and its chunk is the bid transaction followed by
//! the bundle in submitted order.

use std::collections::BTreeSet;

use tracing::debug;

use blocklane_primitives::{types::short_hex, Hash};

use crate::auction::{validate_bid, BidCandidate};
use crate::error::EngineError;
use crate::lanes::{DecodedTx, LaneChunk, LaneContext, LaneKind, LaneSelection};
use crate::mempool::TxRecord;
use crate::proposal::BlockSpace;

pub(crate) fn select(
    ctx: &LaneContext<'_>,
    candidates: &[&TxRecord],
    budget: BlockSpace,
    included: &BTreeSet<Hash>,
) -> Result<LaneSelection, EngineError> {
    let mut selection = LaneSelection::default();
    let validation = ctx.validation();
    let max_txs = ctx.params.max_bundle_size as usize + 1;

    for record in candidates {
        let candidate = match BidCandidate::new(record.hash, &record.raw, &record.tx) {
            Ok(candidate) => candidate,
            Err(err) => {
                selection.evict.push((record.hash, err));
                continue;
            }
        };
        if let Err(err) = ctx.cleared.check(&candidate.bid, &ctx.params.min_bid_increment) {
            selection.evict.push((record.hash, err));
            continue;
        }
        let chunk = match validate_bid(&candidate, &validation) {
            Ok(chunk) => chunk,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(tx = %short_hex(&record.hash), error = %err, "bid failed validation");
                selection.evict.push((record.hash, err));
                continue;
            }
        };

        let used = BlockSpace::of_txs(&chunk);
        if chunk.len() > max_txs || !used.fits_within(&budget) {
            debug!(
                tx = %short_hex(&record.hash),
                bytes = used.bytes,
                gas = used.gas,
                "bid does not fit lane budget"
            );
            continue;
        }
        if chunk.iter().any(|tx| included.contains(&tx.hash)) {
            continue;
        }

        debug!(tx = %short_hex(&record.hash), bid = %candidate.bid.bid_amount, "bid cleared");
        selection.txs = chunk;
        selection.used = used;
        break;
    }
    Ok(selection)
}

pub(crate) fn verify(
    ctx: &LaneContext<'_>,
    txs: &[DecodedTx],
    budget: BlockSpace,
) -> Result<LaneChunk, EngineError> {
    let Some(first) = txs.first() else {
        return Ok(LaneChunk::default());
    };
    if !LaneKind::Auction.matches(&first.signed, ctx.classifier) {
        return Ok(LaneChunk::default());
    }

    let candidate = BidCandidate::new(first.tx.hash, &first.tx.raw, &first.signed)?;
    ctx.cleared.check(&candidate.bid, &ctx.params.min_bid_increment)?;
    let expected = validate_bid(&candidate, &ctx.validation())?;

    let follows_exactly = txs.len() >= expected.len()
        && expected
            .iter()
            .zip(txs)
            .all(|(want, got)| want.hash == got.tx.hash);
    if !follows_exactly {
        return Err(EngineError::InvalidProposal(
            "bid transaction is not followed by exactly its bundle".into(),
        ));
    }
    super::check_chunk(&txs[..expected.len()], budget, ctx.params.max_bundle_size as usize + 1)
}
