//! Proposal types exchanged with the consensus engine.
//!
//! A proposal is an ordered list of raw transactions for one height. The
//! consensus engine treats each transaction as opaque bytes.

use alloc::vec::Vec;

use crate::crypto::{ordered_digest, tx_hash};
use crate::types::{BlockHeight, Hash};

/// One transaction placed in a block, with its cached hash and cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTx {
    pub hash: Hash,
    pub raw: Vec<u8>,
    /// Declared gas limit of the transaction.
    pub gas: u64,
}

impl BlockTx {
    pub fn new(raw: Vec<u8>, gas: u64) -> Self {
        Self {
            hash: tx_hash(&raw),
            raw,
            gas,
        }
    }

    /// Size of the raw transaction in bytes.
    pub fn bytes(&self) -> u64 {
        self.raw.len() as u64
    }
}

/// An ordered block body for a single height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub height: BlockHeight,
    pub txs: Vec<BlockTx>,
}

impl Proposal {
    pub fn empty(height: BlockHeight) -> Self {
        Self {
            height,
            txs: Vec::new(),
        }
    }

    pub fn tx_count(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.txs.iter().map(BlockTx::bytes).sum()
    }

    pub fn total_gas(&self) -> u64 {
        self.txs.iter().fold(0u64, |acc, tx| acc.saturating_add(tx.gas))
    }

    /// SHA-256 over the ordered transaction hashes.
    ///
    /// Two nodes that built the same ordering produce the same hash.
    pub fn hash(&self) -> Hash {
        ordered_digest(self.txs.iter().map(|tx| &tx.hash))
    }

    /// The raw transactions, as handed to consensus.
    pub fn raw_txs(&self) -> Vec<Vec<u8>> {
        self.txs.iter().map(|tx| tx.raw.clone()).collect()
    }
}
