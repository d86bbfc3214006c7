//! Pending transactions: one arena, one ordered index per lane.
//!
//! Locking: the arena and every lane index sit behind their own
//! `parking_lot::RwLock`. Writers take the arena lock before the lane
//! lock, and [`MempoolView`] holds the arena read lock for its whole
//! lifetime, so a construction snapshot never sees a half-applied insert
//! or eviction.

pub mod arena;

pub use arena::{BidEntry, TxArena, TxRecord};

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use blocklane_primitives::{types::short_hex, BlockHeight, Coin, Hash};

use crate::config::{EngineConfig, TieBreak};
use crate::error::EngineError;
use crate::lanes::LaneKind;

/// Position of a transaction within its lane: higher rank first, then
/// the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    rank: Reverse<u128>,
    tie: TieKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TieKey {
    Seq(u64),
    Hash(Hash),
}

/// Ordered hashes of one lane's pending transactions.
#[derive(Debug, Default)]
pub struct LaneIndex {
    order: BTreeMap<OrderKey, Hash>,
    keys: BTreeMap<Hash, OrderKey>,
}

impl LaneIndex {
    fn insert(&mut self, key: OrderKey, hash: Hash) {
        self.order.insert(key, hash);
        self.keys.insert(hash, key);
    }

    fn remove(&mut self, hash: &Hash) -> bool {
        match self.keys.remove(hash) {
            Some(key) => {
                self.order.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Hashes in lane order.
    pub fn hashes(&self) -> impl Iterator<Item = &Hash> {
        self.order.values()
    }
}

/// How each lane ranks its transactions.
#[derive(Debug, Clone)]
struct Ranking {
    fee_denom: String,
    auction_tie: TieBreak,
    base_tie: TieBreak,
}

impl Ranking {
    fn key(&self, record: &TxRecord) -> OrderKey {
        let (rank, tie_break) = match record.lane {
            LaneKind::Auction => (
                record.bid.as_ref().map_or(0, |b| b.amount.amount),
                self.auction_tie,
            ),
            LaneKind::Base => (fee_rank(&record.tx.body.fee, &self.fee_denom), self.base_tie),
            LaneKind::Free => (0, TieBreak::FirstSeen),
        };
        let tie = match tie_break {
            TieBreak::FirstSeen => TieKey::Seq(record.seq),
            TieBreak::BidHash => TieKey::Hash(record.hash),
        };
        OrderKey {
            rank: Reverse(rank),
            tie,
        }
    }
}

/// Fee amount used for base-lane priority; other denoms rank as zero.
pub fn fee_rank(fee: &Coin, fee_denom: &str) -> u128 {
    if fee.denom == fee_denom {
        fee.amount
    } else {
        0
    }
}

pub struct Mempool {
    arena: RwLock<TxArena>,
    auction: RwLock<LaneIndex>,
    free: RwLock<LaneIndex>,
    base: RwLock<LaneIndex>,
    ranking: Ranking,
}

impl Mempool {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            arena: RwLock::new(TxArena::new()),
            auction: RwLock::new(LaneIndex::default()),
            free: RwLock::new(LaneIndex::default()),
            base: RwLock::new(LaneIndex::default()),
            ranking: Ranking {
                fee_denom: config.fee_denom.clone(),
                auction_tie: config.auction_lane.tie_break,
                base_tie: config.base_lane.tie_break,
            },
        }
    }

    fn index(&self, lane: LaneKind) -> &RwLock<LaneIndex> {
        match lane {
            LaneKind::Auction => &self.auction,
            LaneKind::Free => &self.free,
            LaneKind::Base => &self.base,
        }
    }

    /// Add a transaction to its lane.
    pub fn insert(&self, record: TxRecord) -> Result<(), EngineError> {
        let mut arena = self.arena.write();
        Self::insert_locked(&mut arena, self.index(record.lane), &self.ranking, record, false)
    }

    /// Store `record` in the arena and its lane index. `restore` keeps the
    /// record's arrival sequence instead of assigning a new one.
    fn insert_locked(
        arena: &mut TxArena,
        index: &RwLock<LaneIndex>,
        ranking: &Ranking,
        record: TxRecord,
        restore: bool,
    ) -> Result<(), EngineError> {
        let hash = record.hash;
        let lane = record.lane;
        if restore {
            arena.restore(record)?;
        } else {
            arena.insert(record)?;
        }
        if let Some(stored) = arena.get(&hash) {
            index.write().insert(ranking.key(stored), hash);
        }
        debug!(tx = %short_hex(&hash), lane = ?lane, "tx admitted");
        Ok(())
    }

    /// Add a bid, replacing the bidder's pending bid on the same bundle.
    ///
    /// A replacement must clear the pending bid by `min_increment`.
    /// `max_pending` caps the number of pending bids; `0` is unbounded.
    /// Returns the hash of the replaced bid.
    pub fn insert_bid(
        &self,
        record: TxRecord,
        min_increment: &Coin,
        max_pending: usize,
    ) -> Result<Option<Hash>, EngineError> {
        let Some(entry) = record.bid.clone() else {
            return Err(EngineError::MalformedTransaction("not a bid transaction".into()));
        };
        let mut arena = self.arena.write();

        let previous = arena
            .pending_bid(&entry.bidder, &entry.bundle_digest)
            .map(|r| (r.hash, r.bid.as_ref().map(|b| b.amount.clone())));
        if let Some((_, Some(previous))) = &previous {
            check_increment(&entry.amount, previous, min_increment)?;
        }
        if previous.is_none() && max_pending > 0 && self.auction.read().len() >= max_pending {
            return Err(EngineError::LaneFull("auction".into()));
        }

        let replaced = previous.map(|(hash, _)| hash);
        let mut released = None;
        if let Some(old) = &replaced {
            released = arena.remove(old);
            self.auction.write().remove(old);
        }
        if let Err(err) =
            Self::insert_locked(&mut arena, &self.auction, &self.ranking, record, false)
        {
            // A failed replacement leaves the superseded bid where it was.
            if let Some(old) = released {
                let old_hash = old.hash;
                let restored =
                    Self::insert_locked(&mut arena, &self.auction, &self.ranking, old, true);
                if let Err(restore_err) = restored {
                    debug!(
                        tx = %short_hex(&old_hash),
                        error = %restore_err,
                        "superseded bid could not be restored"
                    );
                }
            }
            return Err(err);
        }
        if let Some(old) = &replaced {
            debug!(tx = %short_hex(old), "bid superseded");
        }
        Ok(replaced)
    }

    pub fn remove(&self, hash: &Hash) -> Option<TxRecord> {
        let mut arena = self.arena.write();
        let record = arena.remove(hash)?;
        self.index(record.lane).write().remove(hash);
        Some(record)
    }

    /// Remove every listed hash that is pending; returns how many were.
    pub fn remove_all<'a, I>(&self, hashes: I) -> usize
    where
        I: IntoIterator<Item = &'a Hash>,
    {
        let mut arena = self.arena.write();
        let mut removed = 0;
        for hash in hashes {
            if let Some(record) = arena.remove(hash) {
                self.index(record.lane).write().remove(hash);
                removed += 1;
            }
        }
        removed
    }

    /// Drop pending bids whose bundle shares a transaction with `included`.
    pub fn invalidate_overlapping(&self, included: &BTreeSet<Hash>) -> Vec<Hash> {
        let mut arena = self.arena.write();
        let overlapping = arena.bids_overlapping(included);
        let mut index = self.auction.write();
        for hash in &overlapping {
            arena.remove(hash);
            index.remove(hash);
        }
        overlapping.into_iter().collect()
    }

    /// Drop pending bids that time out at or before `height`.
    pub fn evict_expired_bids(&self, height: BlockHeight) -> Vec<Hash> {
        let mut arena = self.arena.write();
        let expired = arena.bids_expired_at(height);
        let mut index = self.auction.write();
        for hash in &expired {
            arena.remove(hash);
            index.remove(hash);
        }
        expired
    }

    /// Consistent read snapshot across all lanes.
    pub fn read(&self) -> MempoolView<'_> {
        MempoolView {
            arena: self.arena.read(),
            mempool: self,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.read().is_empty()
    }

    pub fn lane_len(&self, lane: LaneKind) -> usize {
        self.index(lane).read().len()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.arena.read().is_standalone(hash)
    }
}

/// Fails unless `bid >= previous + increment`.
pub fn check_increment(bid: &Coin, previous: &Coin, increment: &Coin) -> Result<(), EngineError> {
    let required = previous.amount.saturating_add(increment.amount);
    if bid.denom != previous.denom || bid.amount < required {
        return Err(EngineError::BidIncrementTooSmall {
            bid: bid.clone(),
            previous: previous.clone(),
            increment: increment.clone(),
        });
    }
    Ok(())
}

/// Read snapshot of the mempool. Holds the arena read lock.
pub struct MempoolView<'a> {
    arena: RwLockReadGuard<'a, TxArena>,
    mempool: &'a Mempool,
}

impl<'a> MempoolView<'a> {
    pub fn arena(&self) -> &TxArena {
        &self.arena
    }

    /// Records of `lane` in lane order.
    pub fn ordered(&self, lane: LaneKind) -> Vec<&TxRecord> {
        let index = self.mempool.index(lane).read();
        let records = index.hashes().filter_map(|h| self.arena.get(h)).collect();
        records
    }
}
