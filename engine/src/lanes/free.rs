//! Free lane: fee-exempt transactions in arrival order.

use std::collections::BTreeSet;

use blocklane_primitives::{Hash, SignedTx};

use crate::config::FreeLaneConfig;
use crate::error::EngineError;
use crate::lanes::{DecodedTx, LaneChunk, LaneContext, LaneKind, LaneSelection};
use crate::mempool::TxRecord;
use crate::proposal::BlockSpace;

/// Decides which transactions skip fee deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeClassifier {
    exempt: BTreeSet<String>,
}

impl FreeClassifier {
    pub fn new<I, S>(exempt_msg_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exempt: exempt_msg_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &FreeLaneConfig) -> Self {
        Self::new(config.exempt_msg_types.iter().cloned())
    }

    /// True iff `tx` has at least one message and every message is exempt.
    pub fn is_free(&self, tx: &SignedTx) -> bool {
        !tx.body.msgs.is_empty()
            && tx
                .body
                .msgs
                .iter()
                .all(|msg| self.exempt.contains(msg.type_url()))
    }
}

impl Default for FreeClassifier {
    fn default() -> Self {
        Self::from_config(&FreeLaneConfig::default())
    }
}

/// Arrival order, skipping what does not fit.
pub(crate) fn select(
    ctx: &LaneContext<'_>,
    candidates: &[&TxRecord],
    budget: BlockSpace,
    included: &BTreeSet<Hash>,
) -> LaneSelection {
    super::fill_in_order(candidates, budget, ctx.config.free_lane.max_txs, included)
}

pub(crate) fn verify(
    ctx: &LaneContext<'_>,
    txs: &[DecodedTx],
    budget: BlockSpace,
) -> Result<LaneChunk, EngineError> {
    let len = txs
        .iter()
        .take_while(|tx| LaneKind::Free.matches(&tx.signed, ctx.classifier))
        .count();
    super::check_chunk(&txs[..len], budget, ctx.config.free_lane.max_txs)
}
