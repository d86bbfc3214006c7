//! `BlockEngine`: the entry points the node calls.
//!
//! The engine owns the lane registry, auction params, and mempool, and
//! borrows the ledger on every call. Construction and verification run
//! once per height; ingress may run concurrently with either.
//!
//! Lock order: registry, params, cleared bids, then the mempool.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use blocklane_ledger::{Ledger, LedgerMut};
use blocklane_primitives::{
    crypto::tx_hash, tx::decode_with_hash, types::short_hex, Address, BlockHeight, Hash, Proposal,
    SignedTx,
};

use crate::auction::{
    settle_bid, validate_bid, AuctionBid, BidCandidate, ClearedBids, EscrowSplit,
    ValidationContext,
};
use crate::config::{EngineConfig, GenesisState};
use crate::error::EngineError;
use crate::lanes::{FreeClassifier, LaneContext, LaneKind};
use crate::mempool::{Mempool, TxRecord};
use crate::params::AuctionParams;
use crate::proposal::{handler, BlockSpace, LanePlan, ProposalVerdict};
use crate::registry::{ensure_authority, Lane, LaneRegistry};
use crate::verifier::{Ed25519Verifier, TxVerifier};

pub struct BlockEngine {
    config: EngineConfig,
    registry: RwLock<LaneRegistry>,
    params: RwLock<AuctionParams>,
    cleared: RwLock<ClearedBids>,
    mempool: Mempool,
    classifier: FreeClassifier,
    verifier: Box<dyn TxVerifier>,
}

impl BlockEngine {
    /// Validate `config` and initialise from its genesis state.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = LaneRegistry::from_genesis(config.genesis.lanes.clone())?;
        Ok(Self {
            registry: RwLock::new(registry),
            params: RwLock::new(config.genesis.params.clone()),
            cleared: RwLock::new(ClearedBids::from_entries(config.genesis.cleared_bids.clone())),
            mempool: Mempool::new(&config),
            classifier: FreeClassifier::from_config(&config.free_lane),
            verifier: Box::new(Ed25519Verifier),
            config,
        })
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: impl TxVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    // ── Ingress ──

    /// Admit a raw transaction to its lane. Bids are validated against
    /// the block at `height`.
    pub fn submit_tx(
        &self,
        raw: &[u8],
        height: BlockHeight,
        ledger: &dyn Ledger,
    ) -> Result<Hash, EngineError> {
        let (hash, tx) = decode_with_hash(raw)?;
        if !self.verifier.verify(&tx) {
            return Err(EngineError::MalformedTransaction("invalid signature".into()));
        }
        let kind = LaneKind::classify(&tx, &self.classifier);
        self.registry.read().get(self.lane_id(kind))?;

        match kind {
            LaneKind::Auction => self.submit_bid(hash, raw, tx, height, ledger),
            _ => {
                self.mempool
                    .insert(TxRecord::new(hash, raw.to_vec(), tx, kind, None))?;
                Ok(hash)
            }
        }
    }

    fn submit_bid(
        &self,
        hash: Hash,
        raw: &[u8],
        tx: SignedTx,
        height: BlockHeight,
        ledger: &dyn Ledger,
    ) -> Result<Hash, EngineError> {
        let params = self.params.read().clone();
        let entry = {
            let candidate = BidCandidate::new(hash, raw, &tx)?;
            self.cleared.read().check(&candidate.bid, &params.min_bid_increment)?;
            let view = self.mempool.read();
            let ctx = ValidationContext {
                height,
                params: &params,
                ledger,
                classifier: &self.classifier,
                verifier: self.verifier.as_ref(),
                pending: Some(view.arena()),
            };
            validate_bid(&candidate, &ctx)?;
            candidate.bid.entry()
        };

        let record = TxRecord::new(hash, raw.to_vec(), tx, LaneKind::Auction, Some(entry));
        let replaced = self.mempool.insert_bid(
            record,
            &params.min_bid_increment,
            self.config.auction_lane.max_pending_bids,
        )?;
        if let Some(old) = replaced {
            debug!(tx = %short_hex(&hash), replaced = %short_hex(&old), "bid replaced pending bid");
        }
        Ok(hash)
    }

    // ── Proposals ──

    /// Build the block at `height`.
    ///
    /// Never fails: if construction fails the engine retries with the base
    /// lane alone, then proposes an empty block.
    #[instrument(skip_all, fields(height = height))]
    pub fn prepare_proposal(
        &self,
        max_bytes: u64,
        max_gas: u64,
        height: BlockHeight,
        ledger: &dyn Ledger,
    ) -> Proposal {
        let err = match self.try_prepare_proposal(max_bytes, max_gas, height, ledger) {
            Ok(proposal) => return proposal,
            Err(err) => err,
        };
        warn!(error = %err, "proposal construction failed, retrying with base lane only");
        match self.build(max_bytes, max_gas, height, ledger, Some(LaneKind::Base)) {
            Ok(proposal) => proposal,
            Err(err) => {
                warn!(error = %err, "base lane construction failed, proposing empty block");
                Proposal::empty(height)
            }
        }
    }

    /// Build the block at `height` with every lane, without fallback.
    pub fn try_prepare_proposal(
        &self,
        max_bytes: u64,
        max_gas: u64,
        height: BlockHeight,
        ledger: &dyn Ledger,
    ) -> Result<Proposal, EngineError> {
        self.build(max_bytes, max_gas, height, ledger, None)
    }

    fn build(
        &self,
        max_bytes: u64,
        max_gas: u64,
        height: BlockHeight,
        ledger: &dyn Ledger,
        only: Option<LaneKind>,
    ) -> Result<Proposal, EngineError> {
        let limits = BlockSpace::block_limits(max_bytes, max_gas);
        let plan = self.plan(only);
        let params = self.params.read();
        let cleared = self.cleared.read();

        let prepared = {
            let view = self.mempool.read();
            let ctx = LaneContext {
                height,
                ledger,
                params: &params,
                config: &self.config,
                classifier: &self.classifier,
                verifier: self.verifier.as_ref(),
                cleared: &cleared,
                pending: Some(view.arena()),
            };
            handler::prepare(&plan, &ctx, &view, limits)?
        };

        for (hash, reason) in &prepared.evict {
            if self.mempool.remove(hash).is_some() {
                debug!(tx = %short_hex(hash), reason = %reason, "tx evicted");
            }
        }

        let proposal = prepared.proposal;
        info!(
            txs = proposal.tx_count(),
            bytes = proposal.total_bytes(),
            gas = proposal.total_gas(),
            evicted = prepared.evict.len(),
            "proposal sealed"
        );
        Ok(proposal)
    }

    /// Vote on a received block. Rejections are values, never panics.
    #[instrument(skip_all, fields(height = height))]
    pub fn process_proposal(
        &self,
        txs: &[Vec<u8>],
        max_bytes: u64,
        max_gas: u64,
        height: BlockHeight,
        ledger: &dyn Ledger,
    ) -> ProposalVerdict {
        let limits = BlockSpace::block_limits(max_bytes, max_gas);
        let plan = self.plan(None);
        let params = self.params.read();
        let cleared = self.cleared.read();
        let ctx = LaneContext {
            height,
            ledger,
            params: &params,
            config: &self.config,
            classifier: &self.classifier,
            verifier: self.verifier.as_ref(),
            cleared: &cleared,
            pending: None,
        };

        match handler::process(&plan, &ctx, txs, limits) {
            Ok(()) => {
                debug!(txs = txs.len(), "proposal accepted");
                ProposalVerdict::Accept
            }
            Err(err) => {
                warn!(error = %err, "proposal rejected");
                ProposalVerdict::Reject(err)
            }
        }
    }

    // ── Commit ──

    /// Apply a committed block at `height` to the pending state.
    ///
    /// Included transactions leave the mempool, the winning bid is
    /// recorded for the increment rule and history older than the
    /// retention window is pruned. Bids overlapping included transactions
    /// are dropped and bids that cannot make the next block expire.
    pub fn on_commit(&self, height: BlockHeight, txs: &[Vec<u8>]) {
        let retention = self.params.read().cleared_bid_retention;
        let pruned = {
            let mut cleared = self.cleared.write();
            if let Some(bid) = winning_bid(txs) {
                cleared.record(bid.bidder, bid.bundle_digest(), bid.bid_amount.clone(), height);
            }
            cleared.prune(height, retention)
        };

        let included: BTreeSet<Hash> = txs.iter().map(|raw| tx_hash(raw)).collect();
        let removed = self.mempool.remove_all(&included);
        let invalidated = self.mempool.invalidate_overlapping(&included);
        for hash in &invalidated {
            debug!(tx = %short_hex(hash), "bid overlaps committed transactions, dropped");
        }
        let expired = self.mempool.evict_expired_bids(height.saturating_add(1));

        info!(
            height,
            included = txs.len(),
            removed,
            invalidated = invalidated.len(),
            expired = expired.len(),
            pruned,
            "block committed"
        );
    }

    /// Pay out the winning bid of a committed block, if it has one.
    pub fn settle_winning_bid(
        &self,
        ledger: &mut dyn LedgerMut,
        txs: &[Vec<u8>],
        proposer: &Address,
    ) -> Result<Option<EscrowSplit>, EngineError> {
        let Some(bid) = winning_bid(txs) else {
            return Ok(None);
        };
        let params = self.params.read().clone();
        settle_bid(ledger, &bid.bidder, &bid.bid_amount, proposer, &params).map(Some)
    }

    // ── Queries ──

    pub fn get_lane(&self, id: &str) -> Result<Lane, EngineError> {
        self.registry.read().get(id).cloned()
    }

    /// All lanes by ascending order.
    pub fn get_lanes(&self) -> Vec<Lane> {
        self.registry.read().list()
    }

    pub fn get_params(&self) -> AuctionParams {
        self.params.read().clone()
    }

    /// Current registry, params and cleared-bid history in genesis form.
    pub fn export_genesis(&self) -> GenesisState {
        GenesisState {
            lanes: self.get_lanes(),
            params: self.get_params(),
            cleared_bids: self.cleared.read().export(),
        }
    }

    /// Cleared-bid history entries still inside the retention window.
    pub fn cleared_bid_count(&self) -> usize {
        self.cleared.read().len()
    }

    // ── Governance ──

    pub fn register_lane(&self, caller: &Address, lane: Lane) -> Result<(), EngineError> {
        self.registry
            .write()
            .register(&self.config.authority, caller, lane)
    }

    pub fn update_lane(&self, caller: &Address, lane: Lane) -> Result<(), EngineError> {
        self.registry
            .write()
            .update(&self.config.authority, caller, lane)
    }

    pub fn update_params(
        &self,
        caller: &Address,
        params: AuctionParams,
    ) -> Result<(), EngineError> {
        ensure_authority(&self.config.authority, caller)?;
        params.validate()?;
        info!(
            max_bundle_size = params.max_bundle_size,
            reserve_fee = %params.reserve_fee,
            proposer_fee = %params.proposer_fee,
            cleared_bid_retention = params.cleared_bid_retention,
            "auction params updated"
        );
        *self.params.write() = params;
        Ok(())
    }

    // ── Lane binding ──

    fn lane_kind(&self, id: &str) -> Option<LaneKind> {
        if id == self.config.auction_lane.id {
            Some(LaneKind::Auction)
        } else if id == self.config.free_lane.id {
            Some(LaneKind::Free)
        } else if id == self.config.base_lane.id {
            Some(LaneKind::Base)
        } else {
            None
        }
    }

    fn lane_id(&self, kind: LaneKind) -> &str {
        match kind {
            LaneKind::Auction => &self.config.auction_lane.id,
            LaneKind::Free => &self.config.free_lane.id,
            LaneKind::Base => &self.config.base_lane.id,
        }
    }

    /// Registry lanes by order with their implementations. `only` leaves
    /// every other lane inert so budgets stay where they would be.
    fn plan(&self, only: Option<LaneKind>) -> Vec<LanePlan> {
        self.registry
            .read()
            .list()
            .into_iter()
            .map(|lane| {
                let kind = self
                    .lane_kind(&lane.id)
                    .filter(|kind| only.map_or(true, |o| o == *kind));
                LanePlan { lane, kind }
            })
            .collect()
    }
}

/// The first bid transaction in a block.
fn winning_bid(txs: &[Vec<u8>]) -> Option<AuctionBid> {
    txs.iter().find_map(|raw| {
        let tx = SignedTx::decode(raw).ok()?;
        AuctionBid::from_tx(&tx)
    })
}
