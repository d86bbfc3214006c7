//! Engine error types.

use blocklane_ledger::LedgerError;
use blocklane_primitives::{types::short_hex, Address, Coin};

/// Every failure the engine reports.
///
/// Bid and bundle rejections are local to one transaction: the caller
/// evicts that transaction and carries on. Registry and authority errors
/// leave the registry untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Lane violates a registry invariant.
    #[error("invalid lane: {0}")]
    InvalidLane(String),

    /// Caller is not the configured governance authority.
    #[error("unauthorized: {} is not the authority", short_hex(.caller))]
    Unauthorized { caller: Address },

    /// Updates may not change a lane's order.
    #[error("lane {id:?}: order is immutable (stored {stored}, submitted {submitted})")]
    OrderImmutable {
        id: String,
        stored: u32,
        submitted: u32,
    },

    #[error("not found: {0}")]
    NotFound(String),

    /// Bid timeout is not after the evaluation height.
    #[error("bid expired: timeout height {timeout_height} <= {height}")]
    ExpiredBid { timeout_height: u64, height: u64 },

    #[error("bundle too large: {size} transactions, max {max}")]
    BundleTooLarge { size: usize, max: u32 },

    /// A bundled transaction carries its own auction bid.
    #[error("bundle transaction {index} carries a nested auction bid")]
    NestedBid { index: usize },

    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// The bidder reappears after another signer in the bundle.
    #[error("sandwich detected: bidder reappears at bundle index {index}")]
    SandwichDetected { index: usize },

    #[error("bid {bid} is below the reserve fee {reserve}")]
    BidBelowReserve { bid: Coin, reserve: Coin },

    /// A rebid on an identical bundle does not clear the previous bid by
    /// the minimum increment.
    #[error("bid {bid} must be at least {previous} + {increment}")]
    BidIncrementTooSmall {
        bid: Coin,
        previous: Coin,
        increment: Coin,
    },

    #[error(
        "insufficient funds for {}: have {available}{denom}, need {required}{denom}",
        short_hex(.address)
    )]
    InsufficientFunds {
        address: Address,
        denom: String,
        available: u128,
        required: u128,
    },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("proposal construction failed: {0}")]
    ProposalConstructionFailed(String),

    /// Undecodable bytes, a bad signature, or a badly shaped bid.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// A lane's pending pool is at capacity.
    #[error("lane {0:?} is full")]
    LaneFull(String),

    #[error("invalid auction params: {0}")]
    InvalidParams(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                address,
                denom,
                available,
                required,
            } => Self::InsufficientFunds {
                address,
                denom,
                available,
                required,
            },
            other => Self::Ledger(other),
        }
    }
}

impl From<blocklane_primitives::CodecError> for EngineError {
    fn from(err: blocklane_primitives::CodecError) -> Self {
        Self::MalformedTransaction(err.to_string())
    }
}

impl EngineError {
    /// True for failures of the environment rather than of a transaction.
    ///
    /// Construction aborts on these instead of evicting the transaction
    /// being evaluated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Ledger(_) | Self::ProposalConstructionFailed(_))
    }
}
