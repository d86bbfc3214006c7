//! The three lane implementations behind one contract.
//!
//! Every lane can pick transactions for a block from its pending set
//! (`select_for_block`) and check the chunk of a received block that
//! belongs to it (`verify_chunk`). Both modes compute budgets the same
//! way, so anything a lane selects it also accepts.

pub mod auction;
pub mod base;
pub mod free;

pub use free::FreeClassifier;

use std::collections::BTreeSet;

use blocklane_ledger::Ledger;
use blocklane_primitives::{BlockHeight, BlockTx, Hash, SignedTx};

use crate::auction::{ClearedBids, ValidationContext};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::mempool::{TxArena, TxRecord};
use crate::params::AuctionParams;
use crate::proposal::BlockSpace;
use crate::verifier::TxVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaneKind {
    /// Top-of-block auction: one winning bid and its bundle.
    Auction,
    /// Fee-exempt transactions.
    Free,
    /// Everything else, by fee.
    Base,
}

impl LaneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auction => "auction",
            Self::Free => "free",
            Self::Base => "base",
        }
    }

    /// Would `tx` belong to this lane?
    pub fn matches(&self, tx: &SignedTx, classifier: &FreeClassifier) -> bool {
        match self {
            Self::Auction => tx.contains_bid(),
            Self::Free => !tx.contains_bid() && classifier.is_free(tx),
            Self::Base => !tx.contains_bid() && !classifier.is_free(tx),
        }
    }

    /// The lane that owns `tx`.
    pub fn classify(tx: &SignedTx, classifier: &FreeClassifier) -> Self {
        if Self::Auction.matches(tx, classifier) {
            Self::Auction
        } else if Self::Free.matches(tx, classifier) {
            Self::Free
        } else {
            Self::Base
        }
    }

    /// Pick transactions from `candidates`, already in lane order, within
    /// `budget`. Transactions in `included` are skipped.
    pub fn select_for_block(
        &self,
        ctx: &LaneContext<'_>,
        candidates: &[&TxRecord],
        budget: BlockSpace,
        included: &BTreeSet<Hash>,
    ) -> Result<LaneSelection, EngineError> {
        match self {
            Self::Auction => auction::select(ctx, candidates, budget, included),
            Self::Free => Ok(free::select(ctx, candidates, budget, included)),
            Self::Base => Ok(base::select(ctx, candidates, budget, included)),
        }
    }

    /// Consume and check this lane's prefix of `txs`.
    pub fn verify_chunk(
        &self,
        ctx: &LaneContext<'_>,
        txs: &[DecodedTx],
        budget: BlockSpace,
    ) -> Result<LaneChunk, EngineError> {
        match self {
            Self::Auction => auction::verify(ctx, txs, budget),
            Self::Free => free::verify(ctx, txs, budget),
            Self::Base => base::verify(ctx, txs, budget),
        }
    }
}

/// Read-only inputs shared by all lanes for one block.
pub struct LaneContext<'a> {
    /// Height of the block being built or checked.
    pub height: BlockHeight,
    pub ledger: &'a dyn Ledger,
    pub params: &'a AuctionParams,
    pub config: &'a EngineConfig,
    pub classifier: &'a FreeClassifier,
    pub verifier: &'a dyn TxVerifier,
    pub cleared: &'a ClearedBids,
    /// Local pending set; set when constructing, `None` when verifying.
    pub pending: Option<&'a TxArena>,
}

impl<'a> LaneContext<'a> {
    pub fn validation(&self) -> ValidationContext<'a> {
        ValidationContext {
            height: self.height,
            params: self.params,
            ledger: self.ledger,
            classifier: self.classifier,
            verifier: self.verifier,
            pending: self.pending,
        }
    }
}

/// What a lane picked for the block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneSelection {
    pub txs: Vec<BlockTx>,
    pub used: BlockSpace,
    /// Transactions that failed validation, to drop from the mempool.
    pub evict: Vec<(Hash, EngineError)>,
}

/// The accepted prefix of a received block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneChunk {
    pub len: usize,
    pub used: BlockSpace,
}

/// A received transaction, decoded once for every lane to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTx {
    pub tx: BlockTx,
    pub signed: SignedTx,
}

impl DecodedTx {
    pub fn decode(raw: &[u8]) -> Result<Self, EngineError> {
        let signed = SignedTx::decode(raw)?;
        let tx = BlockTx::new(raw.to_vec(), signed.body.gas_limit);
        Ok(Self { tx, signed })
    }
}

/// Take candidates in order, skipping any that do not fit. `max_txs == 0`
/// means no cap.
pub(crate) fn fill_in_order(
    candidates: &[&TxRecord],
    budget: BlockSpace,
    max_txs: usize,
    included: &BTreeSet<Hash>,
) -> LaneSelection {
    let mut selection = LaneSelection::default();
    for record in candidates {
        if max_txs > 0 && selection.txs.len() >= max_txs {
            break;
        }
        if included.contains(&record.hash) {
            continue;
        }
        let next = selection
            .used
            .saturating_add(BlockSpace::new(record.bytes(), record.gas()));
        if !next.fits_within(&budget) {
            continue;
        }
        selection.txs.push(BlockTx {
            hash: record.hash,
            raw: record.raw.clone(),
            gas: record.gas(),
        });
        selection.used = next;
    }
    selection
}

/// Cap and budget checks shared by every lane's verify mode.
pub(crate) fn check_chunk(
    txs: &[DecodedTx],
    budget: BlockSpace,
    max_txs: usize,
) -> Result<LaneChunk, EngineError> {
    if max_txs > 0 && txs.len() > max_txs {
        return Err(EngineError::InvalidProposal(format!(
            "{} transactions exceed the lane cap of {}",
            txs.len(),
            max_txs
        )));
    }
    let used = BlockSpace::of_txs(txs.iter().map(|t| &t.tx));
    if !used.fits_within(&budget) {
        return Err(EngineError::InvalidProposal(format!(
            "lane uses {} bytes / {} gas, budget is {} bytes / {} gas",
            used.bytes, used.gas, budget.bytes, budget.gas
        )));
    }
    Ok(LaneChunk {
        len: txs.len(),
        used,
    })
}
