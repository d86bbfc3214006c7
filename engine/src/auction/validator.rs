//! Bundle validator: decides whether a bid is admissible.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. Timeout: the bid's timeout height is after the evaluation height
//! 2. Structure: bundle size, decodable signed transactions, no nested bids
//! 3. Duplication: nothing pending on its own, nothing repeated, no replayed nonce
//! 4. Sandwich: the bidder's transactions form a contiguous prefix
//! 5. Bid floor: the bid is at least the reserve fee
//! 6. Solvency: a simulated run of the bid and bundle never overdraws
//!
//! The same checks run at submission and again at every inclusion
//! attempt, since balances and the mempool change in between.

use std::collections::BTreeSet;

use blocklane_ledger::{BalanceOverlay, Ledger};
use blocklane_primitives::{tx::decode_with_hash, BlockHeight, BlockTx, Hash, SignedTx};

use crate::auction::bid::AuctionBid;
use crate::error::EngineError;
use crate::lanes::FreeClassifier;
use crate::mempool::TxArena;
use crate::params::AuctionParams;
use crate::verifier::TxVerifier;

/// A bid transaction together with the bid it carries.
#[derive(Debug, Clone)]
pub struct BidCandidate<'a> {
    pub hash: Hash,
    pub raw: &'a [u8],
    pub tx: &'a SignedTx,
    pub bid: AuctionBid,
}

impl<'a> BidCandidate<'a> {
    pub fn new(hash: Hash, raw: &'a [u8], tx: &'a SignedTx) -> Result<Self, EngineError> {
        let bid = AuctionBid::from_tx(tx).ok_or_else(|| {
            EngineError::MalformedTransaction(
                "a bid must be the only message of its transaction".into(),
            )
        })?;
        Ok(Self { hash, raw, tx, bid })
    }
}

/// Everything the validator reads besides the bid itself.
pub struct ValidationContext<'a> {
    /// Height of the block the bid would land in.
    pub height: BlockHeight,
    pub params: &'a AuctionParams,
    pub ledger: &'a dyn Ledger,
    pub classifier: &'a FreeClassifier,
    pub verifier: &'a dyn TxVerifier,
    /// Local pending transactions. `None` when checking someone else's
    /// proposal, whose bundle may legitimately be pending here too.
    pub pending: Option<&'a TxArena>,
}

/// Validate `candidate`; on success return its block chunk, the bid
/// transaction followed by the bundle.
pub fn validate_bid(
    candidate: &BidCandidate<'_>,
    ctx: &ValidationContext<'_>,
) -> Result<Vec<BlockTx>, EngineError> {
    let bid = &candidate.bid;

    // 1. Timeout
    if bid.timeout_height <= ctx.height {
        return Err(EngineError::ExpiredBid {
            timeout_height: bid.timeout_height,
            height: ctx.height,
        });
    }

    // 2. Structure
    let bundle = check_structure(candidate, ctx)?;

    // 3. Duplication
    check_duplicates(candidate, &bundle, ctx)?;

    // 4. Sandwich
    if ctx.params.front_running_protection {
        check_sandwich(bid, &bundle)?;
    }

    // 5. Bid floor
    let reserve = &ctx.params.reserve_fee;
    if bid.bid_amount.denom != ctx.params.bid_denom() || bid.bid_amount.amount < reserve.amount {
        return Err(EngineError::BidBelowReserve {
            bid: bid.bid_amount.clone(),
            reserve: reserve.clone(),
        });
    }

    // 6. Solvency
    simulate(candidate, &bundle, ctx)?;

    let mut chunk = Vec::with_capacity(bundle.len() + 1);
    chunk.push(BlockTx::new(candidate.raw.to_vec(), candidate.tx.body.gas_limit));
    chunk.extend(
        bundle
            .into_iter()
            .map(|b| BlockTx {
                hash: b.hash,
                raw: b.raw.to_vec(),
                gas: b.tx.body.gas_limit,
            }),
    );
    Ok(chunk)
}

struct Bundled<'a> {
    hash: Hash,
    raw: &'a [u8],
    tx: SignedTx,
}

fn check_structure<'a>(
    candidate: &'a BidCandidate<'_>,
    ctx: &ValidationContext<'_>,
) -> Result<Vec<Bundled<'a>>, EngineError> {
    let bid = &candidate.bid;
    if bid.bidder != candidate.tx.body.signer {
        return Err(EngineError::MalformedTransaction(
            "bidder must sign the bid transaction".into(),
        ));
    }
    if bid.bundle.is_empty() {
        return Err(EngineError::MalformedTransaction("bundle is empty".into()));
    }
    let max = ctx.params.max_bundle_size;
    if bid.bundle.len() > max as usize {
        return Err(EngineError::BundleTooLarge {
            size: bid.bundle.len(),
            max,
        });
    }

    let mut bundle = Vec::with_capacity(bid.bundle.len());
    for (index, raw) in bid.bundle.iter().enumerate() {
        let (hash, tx) = decode_with_hash(raw).map_err(|e| {
            EngineError::MalformedTransaction(format!("bundle transaction {}: {}", index, e))
        })?;
        if tx.contains_bid() {
            return Err(EngineError::NestedBid { index });
        }
        if !ctx.verifier.verify(&tx) {
            return Err(EngineError::MalformedTransaction(format!(
                "bundle transaction {}: invalid signature",
                index
            )));
        }
        bundle.push(Bundled { hash, raw, tx });
    }
    Ok(bundle)
}

fn check_duplicates(
    candidate: &BidCandidate<'_>,
    bundle: &[Bundled<'_>],
    ctx: &ValidationContext<'_>,
) -> Result<(), EngineError> {
    let mut hashes = BTreeSet::new();
    let mut nonces = BTreeSet::new();
    nonces.insert((candidate.tx.body.signer, candidate.tx.body.nonce));

    for (index, b) in bundle.iter().enumerate() {
        if !hashes.insert(b.hash) {
            return Err(EngineError::DuplicateTransaction(format!(
                "bundle transaction {} appears twice",
                index
            )));
        }
        if ctx.pending.is_some_and(|arena| arena.is_standalone(&b.hash)) {
            return Err(EngineError::DuplicateTransaction(format!(
                "bundle transaction {} is already pending on its own",
                index
            )));
        }
        let signer = b.tx.body.signer;
        if !nonces.insert((signer, b.tx.body.nonce)) {
            return Err(EngineError::DuplicateTransaction(format!(
                "bundle transaction {} repeats nonce {}",
                index, b.tx.body.nonce
            )));
        }
        let sequence = ctx.ledger.sequence(&signer)?;
        if b.tx.body.nonce < sequence {
            return Err(EngineError::DuplicateTransaction(format!(
                "bundle transaction {} replays nonce {} (account at {})",
                index, b.tx.body.nonce, sequence
            )));
        }
    }
    Ok(())
}

fn check_sandwich(bid: &AuctionBid, bundle: &[Bundled<'_>]) -> Result<(), EngineError> {
    let mut others_seen = false;
    for (index, b) in bundle.iter().enumerate() {
        if b.tx.body.signer == bid.bidder {
            if others_seen {
                return Err(EngineError::SandwichDetected { index });
            }
        } else {
            others_seen = true;
        }
    }
    Ok(())
}

/// Run the bid payment and every bundled transaction against a balance
/// overlay. Fee-exempt transactions pay no fee.
fn simulate(
    candidate: &BidCandidate<'_>,
    bundle: &[Bundled<'_>],
    ctx: &ValidationContext<'_>,
) -> Result<(), EngineError> {
    let mut overlay = BalanceOverlay::new(ctx.ledger);
    let bidder = candidate.bid.bidder;
    overlay.debit(&bidder, &candidate.bid.bid_amount)?;
    overlay.debit(&bidder, &candidate.tx.body.fee)?;

    for b in bundle {
        let signer = b.tx.body.signer;
        if !ctx.classifier.is_free(&b.tx) {
            overlay.debit(&signer, &b.tx.body.fee)?;
        }
        for msg in &b.tx.body.msgs {
            if let Some((to, amount)) = msg.transfer() {
                overlay.transfer(&signer, to, amount)?;
            }
        }
    }
    Ok(())
}
