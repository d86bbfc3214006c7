//! Proposal handler: one algorithm, two modes.
//!
//! Lanes are visited by ascending order, `Init → PerLaneFill(0) → … →
//! Sealed`. Each lane's budget is its block-space fraction of the block
//! limits, capped by what earlier lanes left.
//!
//! - **Construct** asks each lane to select from its pending set.
//! - **Verify** walks a received block; each lane consumes the prefix it
//!   owns and checks it under its own rule. Anything left over after the
//!   last lane rejects the block.

use std::collections::BTreeSet;

use tracing::debug;

use blocklane_primitives::{types::short_hex, BlockHeight, BlockTx, Hash, Proposal};

use crate::error::EngineError;
use crate::lanes::{DecodedTx, LaneContext, LaneKind};
use crate::mempool::MempoolView;
use crate::proposal::space::{lane_budget, BlockSpace};
use crate::registry::Lane;

/// Where the handler is in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Init,
    /// Filling the lane at this position in the plan.
    PerLaneFill(usize),
    Sealed,
}

/// A registry lane and the implementation bound to it. Lanes without an
/// implementation take no transactions but still hold their position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanePlan {
    pub lane: Lane,
    pub kind: Option<LaneKind>,
}

/// A constructed proposal and the transactions to evict afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub proposal: Proposal,
    pub evict: Vec<(Hash, EngineError)>,
}

/// Vote on a received proposal.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalVerdict {
    Accept,
    Reject(EngineError),
}

impl ProposalVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

struct BlockFill {
    state: FillState,
    limits: BlockSpace,
    used: BlockSpace,
    txs: Vec<BlockTx>,
    included: BTreeSet<Hash>,
}

impl BlockFill {
    fn new(limits: BlockSpace) -> Self {
        Self {
            state: FillState::Init,
            limits,
            used: BlockSpace::ZERO,
            txs: Vec::new(),
            included: BTreeSet::new(),
        }
    }

    fn enter(&mut self, position: usize) {
        debug_assert!(self.state != FillState::Sealed);
        self.state = FillState::PerLaneFill(position);
    }

    fn budget(&self, lane: &Lane) -> BlockSpace {
        lane_budget(self.limits, self.used, lane.block_space_fraction)
    }

    fn append(&mut self, txs: Vec<BlockTx>, used: BlockSpace) {
        for tx in &txs {
            self.included.insert(tx.hash);
        }
        self.txs.extend(txs);
        self.used = self.used.saturating_add(used);
    }

    fn seal(mut self, height: BlockHeight) -> Proposal {
        self.state = FillState::Sealed;
        Proposal {
            height,
            txs: self.txs,
        }
    }
}

/// Build a proposal from the mempool snapshot in `view`.
pub fn prepare(
    plan: &[LanePlan],
    ctx: &LaneContext<'_>,
    view: &MempoolView<'_>,
    limits: BlockSpace,
) -> Result<Prepared, EngineError> {
    let mut fill = BlockFill::new(limits);
    let mut evict = Vec::new();

    for (position, entry) in plan.iter().enumerate() {
        fill.enter(position);
        let Some(kind) = entry.kind else {
            continue;
        };
        let budget = fill.budget(&entry.lane);
        let candidates = view.ordered(kind);
        let selection = kind
            .select_for_block(ctx, &candidates, budget, &fill.included)
            .map_err(|err| {
                let reason = format!("lane {:?}: {}", entry.lane.id, err);
                EngineError::ProposalConstructionFailed(reason)
            })?;
        debug!(
            lane = %entry.lane.id,
            pending = candidates.len(),
            selected = selection.txs.len(),
            bytes = selection.used.bytes,
            "lane filled"
        );
        evict.extend(selection.evict);
        fill.append(selection.txs, selection.used);
    }

    Ok(Prepared {
        proposal: fill.seal(ctx.height),
        evict,
    })
}

/// Check a received block against the same lane rules.
pub fn process(
    plan: &[LanePlan],
    ctx: &LaneContext<'_>,
    raw_txs: &[Vec<u8>],
    limits: BlockSpace,
) -> Result<(), EngineError> {
    let mut decoded = Vec::with_capacity(raw_txs.len());
    let mut seen = BTreeSet::new();
    for (i, raw) in raw_txs.iter().enumerate() {
        let tx = DecodedTx::decode(raw)
            .map_err(|err| EngineError::InvalidProposal(format!("transaction {}: {}", i, err)))?;
        if !seen.insert(tx.tx.hash) {
            return Err(EngineError::InvalidProposal(format!(
                "transaction {} ({}) appears twice",
                i,
                short_hex(&tx.tx.hash)
            )));
        }
        if !ctx.verifier.verify(&tx.signed) {
            return Err(EngineError::InvalidProposal(format!(
                "transaction {}: invalid signature",
                i
            )));
        }
        decoded.push(tx);
    }

    let total = BlockSpace::of_txs(decoded.iter().map(|t| &t.tx));
    if !total.fits_within(&limits) {
        return Err(EngineError::InvalidProposal(format!(
            "block uses {} bytes / {} gas, limit is {} bytes / {} gas",
            total.bytes, total.gas, limits.bytes, limits.gas
        )));
    }

    let mut fill = BlockFill::new(limits);
    let mut pos = 0;
    for (position, entry) in plan.iter().enumerate() {
        fill.enter(position);
        let Some(kind) = entry.kind else {
            continue;
        };
        let budget = fill.budget(&entry.lane);
        let chunk = kind
            .verify_chunk(ctx, &decoded[pos..], budget)
            .map_err(|err| match err {
                EngineError::InvalidProposal(msg) => {
                    EngineError::InvalidProposal(format!("lane {:?}: {}", entry.lane.id, msg))
                }
                other => {
                    EngineError::InvalidProposal(format!("lane {:?}: {}", entry.lane.id, other))
                }
            })?;
        let txs = decoded[pos..pos + chunk.len].iter().map(|t| t.tx.clone()).collect();
        fill.append(txs, chunk.used);
        pos += chunk.len;
    }

    if pos != decoded.len() {
        return Err(EngineError::InvalidProposal(format!(
            "{} transactions after position {} belong to no lane",
            decoded.len() - pos,
            pos
        )));
    }
    fill.seal(ctx.height);
    Ok(())
}
