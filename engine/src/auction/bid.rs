//! Auction bids and the record of bids already cleared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use blocklane_primitives::{
    crypto::{ordered_digest, tx_hash},
    types::{hex_address, hex_hash},
    Address, BlockHeight, Coin, Hash, SignedTx,
};

use crate::error::EngineError;
use crate::mempool::{check_increment, BidEntry};

/// A bid for top-of-block placement, taken from a bid transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionBid {
    pub bidder: Address,
    pub bid_amount: Coin,
    /// Raw signed transactions, in block order.
    pub bundle: Vec<Vec<u8>>,
    /// The carrying transaction's timeout height.
    pub timeout_height: BlockHeight,
}

impl AuctionBid {
    /// The bid carried by `tx`, if its only message is a bid.
    pub fn from_tx(tx: &SignedTx) -> Option<Self> {
        let msg = tx.auction_bid()?;
        Some(Self {
            bidder: msg.bidder,
            bid_amount: msg.bid.clone(),
            bundle: msg.transactions.clone(),
            timeout_height: tx.body.timeout_height,
        })
    }

    pub fn bundle_hashes(&self) -> Vec<Hash> {
        self.bundle.iter().map(|raw| tx_hash(raw)).collect()
    }

    /// Identifies the bundle's content and order.
    pub fn bundle_digest(&self) -> Hash {
        bundle_digest(&self.bundle_hashes())
    }

    /// Bookkeeping the mempool keeps for this bid.
    pub fn entry(&self) -> BidEntry {
        let bundle = self.bundle_hashes();
        BidEntry {
            bidder: self.bidder,
            amount: self.bid_amount.clone(),
            bundle_digest: bundle_digest(&bundle),
            bundle,
        }
    }
}

pub fn bundle_digest(hashes: &[Hash]) -> Hash {
    ordered_digest(hashes)
}

/// One entry of the cleared-bid history, in genesis form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedBid {
    #[serde(with = "hex_address")]
    pub bidder: Address,
    #[serde(with = "hex_hash")]
    pub bundle_digest: Hash,
    pub amount: Coin,
    /// Height of the latest block that cleared this bundle.
    pub height: BlockHeight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cleared {
    amount: Coin,
    height: BlockHeight,
}

/// Highest cleared bid per (bidder, bundle digest).
///
/// A later bid on an identical bundle must beat the cleared amount by the
/// minimum increment. The history is chain state: it is exported with the
/// genesis and entries expire a fixed number of blocks after they last
/// cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearedBids {
    cleared: BTreeMap<(Address, Hash), Cleared>,
}

impl ClearedBids {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the history from exported entries. Duplicate keys keep the
    /// highest amount.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ClearedBid>,
    {
        let mut cleared = Self::new();
        for entry in entries {
            cleared.record(entry.bidder, entry.bundle_digest, entry.amount, entry.height);
        }
        cleared
    }

    pub fn record(&mut self, bidder: Address, digest: Hash, amount: Coin, height: BlockHeight) {
        let slot = self.cleared.entry((bidder, digest)).or_insert_with(|| Cleared {
            amount: amount.clone(),
            height,
        });
        slot.height = slot.height.max(height);
        if slot.amount.denom == amount.denom && amount.amount > slot.amount.amount {
            slot.amount = amount;
        }
    }

    pub fn previous(&self, bidder: &Address, digest: &Hash) -> Option<&Coin> {
        self.cleared.get(&(*bidder, *digest)).map(|c| &c.amount)
    }

    /// Drop entries last cleared at or before `height - retention`.
    /// Returns how many were dropped.
    pub fn prune(&mut self, height: BlockHeight, retention: u64) -> usize {
        let before = self.cleared.len();
        self.cleared.retain(|_, c| c.height.saturating_add(retention) > height);
        before - self.cleared.len()
    }

    /// Entries in key order.
    pub fn export(&self) -> Vec<ClearedBid> {
        self.cleared
            .iter()
            .map(|((bidder, digest), c)| ClearedBid {
                bidder: *bidder,
                bundle_digest: *digest,
                amount: c.amount.clone(),
                height: c.height,
            })
            .collect()
    }

    /// `BidIncrementTooSmall` if `bid` repeats a cleared bundle without
    /// clearing the previous amount by `increment`.
    pub fn check(&self, bid: &AuctionBid, increment: &Coin) -> Result<(), EngineError> {
        match self.previous(&bid.bidder, &bid.bundle_digest()) {
            Some(previous) => check_increment(&bid.bid_amount, previous, increment),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.cleared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }
}
