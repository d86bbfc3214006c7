//! Base lane: the catch-all for ordinary fee-paying transactions.
//!
//! Transactions are ranked by fee in the configured denom, highest
//! first. A received block's base chunk must never rank a transaction
//! above the one before it.

use std::collections::BTreeSet;

use blocklane_primitives::Hash;

use crate::error::EngineError;
use crate::lanes::{DecodedTx, LaneChunk, LaneContext, LaneKind, LaneSelection};
use crate::mempool::{fee_rank, TxRecord};
use crate::proposal::BlockSpace;

pub(crate) fn select(
    ctx: &LaneContext<'_>,
    candidates: &[&TxRecord],
    budget: BlockSpace,
    included: &BTreeSet<Hash>,
) -> LaneSelection {
    super::fill_in_order(candidates, budget, ctx.config.base_lane.max_txs, included)
}

pub(crate) fn verify(
    ctx: &LaneContext<'_>,
    txs: &[DecodedTx],
    budget: BlockSpace,
) -> Result<LaneChunk, EngineError> {
    let len = txs
        .iter()
        .take_while(|tx| LaneKind::Base.matches(&tx.signed, ctx.classifier))
        .count();
    let chunk = &txs[..len];

    let fee_denom = &ctx.config.fee_denom;
    for (i, pair) in chunk.windows(2).enumerate() {
        let prev = fee_rank(&pair[0].signed.body.fee, fee_denom);
        let next = fee_rank(&pair[1].signed.body.fee, fee_denom);
        if next > prev {
            return Err(EngineError::InvalidProposal(format!(
                "base transaction {} pays {}{} after one paying {}{}",
                i + 1,
                next,
                fee_denom,
                prev,
                fee_denom
            )));
        }
    }
    super::check_chunk(chunk, budget, ctx.config.base_lane.max_txs)
}
