//! Transaction arena: every pending transaction, stored once, keyed by hash.
//!
//! Lanes hold ordered hash indexes into the arena and never own copies.
//! The arena also tracks which pending bids claim a transaction through
//! their bundle, so a transaction is never both pending on its own and
//! promised to a bundle.

use std::collections::{BTreeMap, BTreeSet};

use blocklane_primitives::{Address, BlockHeight, Coin, Hash, SignedTx, types::short_hex};

use crate::error::EngineError;
use crate::lanes::LaneKind;

/// Auction data kept alongside a pending bid transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidEntry {
    pub bidder: Address,
    pub amount: Coin,
    /// Ordered digest of the bundle's transaction hashes.
    pub bundle_digest: Hash,
    /// Hashes of the bundled transactions, in bundle order.
    pub bundle: Vec<Hash>,
}

/// One pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub hash: Hash,
    pub raw: Vec<u8>,
    pub tx: SignedTx,
    /// The lane that owns this transaction.
    pub lane: LaneKind,
    /// Arrival sequence, assigned by the arena.
    pub seq: u64,
    pub bid: Option<BidEntry>,
}

impl TxRecord {
    pub fn new(
        hash: Hash,
        raw: Vec<u8>,
        tx: SignedTx,
        lane: LaneKind,
        bid: Option<BidEntry>,
    ) -> Self {
        Self {
            hash,
            raw,
            tx,
            lane,
            seq: 0,
            bid,
        }
    }

    pub fn bytes(&self) -> u64 {
        self.raw.len() as u64
    }

    pub fn gas(&self) -> u64 {
        self.tx.body.gas_limit
    }

    pub fn timeout_height(&self) -> BlockHeight {
        self.tx.body.timeout_height
    }
}

#[derive(Debug, Default)]
pub struct TxArena {
    records: BTreeMap<Hash, TxRecord>,
    /// Bundled tx hash → pending bids whose bundle contains it.
    claims: BTreeMap<Hash, BTreeSet<Hash>>,
    /// (bidder, bundle digest) → pending bid hash.
    bids_by_bundle: BTreeMap<(Address, Hash), Hash>,
    next_seq: u64,
}

impl TxArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, hash: &Hash) -> Option<&TxRecord> {
        self.records.get(hash)
    }

    /// True if `hash` is pending as a transaction of its own.
    pub fn is_standalone(&self, hash: &Hash) -> bool {
        self.records.contains_key(hash)
    }

    /// True if some pending bid carries `hash` in its bundle.
    pub fn is_claimed(&self, hash: &Hash) -> bool {
        self.claims.contains_key(hash)
    }

    /// The pending bid from `bidder` on the bundle with `digest`.
    pub fn pending_bid(&self, bidder: &Address, digest: &Hash) -> Option<&TxRecord> {
        self.bids_by_bundle
            .get(&(*bidder, *digest))
            .and_then(|hash| self.records.get(hash))
    }

    /// Add a record and return its arrival sequence.
    pub fn insert(&mut self, record: TxRecord) -> Result<u64, EngineError> {
        let seq = self.next_seq;
        self.admit(record, seq)?;
        self.next_seq += 1;
        Ok(seq)
    }

    /// Put back a record taken out by [`TxArena::remove`], keeping its
    /// arrival sequence.
    pub fn restore(&mut self, record: TxRecord) -> Result<u64, EngineError> {
        let seq = record.seq;
        self.admit(record, seq)?;
        Ok(seq)
    }

    fn admit(&mut self, mut record: TxRecord, seq: u64) -> Result<(), EngineError> {
        if self.records.contains_key(&record.hash) {
            return Err(EngineError::DuplicateTransaction(format!(
                "{} is already pending",
                short_hex(&record.hash)
            )));
        }
        if self.is_claimed(&record.hash) {
            return Err(EngineError::DuplicateTransaction(format!(
                "{} is claimed by a pending bundle",
                short_hex(&record.hash)
            )));
        }
        if let Some(bid) = &record.bid {
            if let Some(hash) = bid.bundle.iter().find(|h| self.records.contains_key(*h)) {
                return Err(EngineError::DuplicateTransaction(format!(
                    "bundled {} is already pending on its own",
                    short_hex(hash)
                )));
            }
            for hash in &bid.bundle {
                self.claims.entry(*hash).or_default().insert(record.hash);
            }
            self.bids_by_bundle
                .insert((bid.bidder, bid.bundle_digest), record.hash);
        }

        record.seq = seq;
        self.records.insert(record.hash, record);
        Ok(())
    }

    /// Remove a record, releasing the claims of a bid.
    pub fn remove(&mut self, hash: &Hash) -> Option<TxRecord> {
        let record = self.records.remove(hash)?;
        if let Some(bid) = &record.bid {
            for bundled in &bid.bundle {
                if let Some(bids) = self.claims.get_mut(bundled) {
                    bids.remove(hash);
                    if bids.is_empty() {
                        self.claims.remove(bundled);
                    }
                }
            }
            let key = (bid.bidder, bid.bundle_digest);
            if self.bids_by_bundle.get(&key) == Some(hash) {
                self.bids_by_bundle.remove(&key);
            }
        }
        Some(record)
    }

    /// Pending bids whose bundle shares a transaction with `hashes`.
    pub fn bids_overlapping(&self, hashes: &BTreeSet<Hash>) -> BTreeSet<Hash> {
        hashes
            .iter()
            .filter_map(|h| self.claims.get(h))
            .flatten()
            .copied()
            .collect()
    }

    /// Pending bids that cannot be included at `height` or later.
    pub fn bids_expired_at(&self, height: BlockHeight) -> Vec<Hash> {
        self.records
            .values()
            .filter(|r| r.bid.is_some() && r.timeout_height() <= height)
            .map(|r| r.hash)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklane_primitives::{Msg, TxBody};

    fn signed(nonce: u64, timeout_height: u64) -> SignedTx {
        SignedTx {
            body: TxBody {
                signer: [1u8; 32],
                nonce,
                fee: Coin::new(1, "stake"),
                gas_limit: 10,
                timeout_height,
                msgs: vec![Msg::Send {
                    to: [2u8; 32],
                    amount: Coin::new(1, "stake"),
                }],
            },
            signature: [0u8; 64],
            signed_bytes: Vec::new(),
        }
    }

    fn plain(hash: u8) -> TxRecord {
        TxRecord::new([hash; 32], vec![hash; 4], signed(hash as u64, 0), LaneKind::Base, None)
    }

    fn bid(hash: u8, bundle: Vec<Hash>, timeout: u64) -> TxRecord {
        let entry = BidEntry {
            bidder: [1u8; 32],
            amount: Coin::new(100, "stake"),
            bundle_digest: blocklane_primitives::crypto::ordered_digest(&bundle),
            bundle,
        };
        let tx = signed(hash as u64, timeout);
        TxRecord::new([hash; 32], vec![hash; 8], tx, LaneKind::Auction, Some(entry))
    }

    #[test]
    fn test_insert_assigns_arrival_sequence() {
        let mut arena = TxArena::new();
        assert_eq!(arena.insert(plain(1)).unwrap(), 0);
        assert_eq!(arena.insert(plain(2)).unwrap(), 1);
        assert_eq!(arena.get(&[2u8; 32]).unwrap().seq, 1);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let mut arena = TxArena::new();
        arena.insert(plain(1)).unwrap();
        assert!(matches!(arena.insert(plain(1)), Err(EngineError::DuplicateTransaction(_))));
    }

    #[test]
    fn test_claimed_tx_cannot_be_standalone() {
        let mut arena = TxArena::new();
        arena.insert(bid(9, vec![[1u8; 32]], 10)).unwrap();
        assert!(arena.is_claimed(&[1u8; 32]));
        assert!(matches!(arena.insert(plain(1)), Err(EngineError::DuplicateTransaction(_))));
    }

    #[test]
    fn test_bid_cannot_claim_standalone_tx() {
        let mut arena = TxArena::new();
        arena.insert(plain(1)).unwrap();
        let err = arena.insert(bid(9, vec![[1u8; 32]], 10)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTransaction(_)));
        // Nothing was claimed by the rejected bid.
        assert!(!arena.is_claimed(&[1u8; 32]));
    }

    #[test]
    fn test_remove_releases_claims() {
        let mut arena = TxArena::new();
        let record = bid(9, vec![[1u8; 32], [2u8; 32]], 10);
        let digest = record.bid.as_ref().unwrap().bundle_digest;
        arena.insert(record).unwrap();
        assert!(arena.pending_bid(&[1u8; 32], &digest).is_some());

        arena.remove(&[9u8; 32]).unwrap();
        assert!(!arena.is_claimed(&[1u8; 32]));
        assert!(arena.pending_bid(&[1u8; 32], &digest).is_none());
        arena.insert(plain(1)).unwrap();
    }

    #[test]
    fn test_overlapping_bids() {
        let mut arena = TxArena::new();
        arena.insert(bid(9, vec![[1u8; 32]], 10)).unwrap();
        arena.insert(bid(8, vec![[2u8; 32], [1u8; 32]], 10)).unwrap();
        arena.insert(bid(7, vec![[3u8; 32]], 10)).unwrap();

        let included: BTreeSet<Hash> = [[1u8; 32]].into_iter().collect();
        let overlapping = arena.bids_overlapping(&included);
        assert_eq!(overlapping.into_iter().collect::<Vec<_>>(), vec![[8u8; 32], [9u8; 32]]);
    }

    #[test]
    fn test_expired_bids() {
        let mut arena = TxArena::new();
        arena.insert(bid(9, vec![[1u8; 32]], 5)).unwrap();
        arena.insert(bid(8, vec![[2u8; 32]], 6)).unwrap();
        arena.insert(plain(3)).unwrap();
        assert_eq!(arena.bids_expired_at(5), vec![[9u8; 32]]);
        assert_eq!(arena.bids_expired_at(6).len(), 2);
    }
}
